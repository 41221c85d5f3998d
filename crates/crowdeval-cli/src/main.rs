mod command;
mod plot;

fn main() -> anyhow::Result<()> {
    command::run()
}
