//! Dense linear algebra for the small systems solved by Newton's method.

/// Solves `a · x = b` for a square row-major `a` by Gaussian elimination with
/// partial pivoting.
///
/// Returns `None` if `a` is singular to working precision.
#[must_use]
pub fn solve(mut a: Vec<f64>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    assert_eq!(a.len(), n * n, "matrix must be square and match rhs");

    for col in 0..n {
        let pivot =
            (col..n).max_by(|&i, &j| a[i * n + col].abs().total_cmp(&a[j * n + col].abs()))?;
        if a[pivot * n + col].abs() < 1e-12 {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                a.swap(pivot * n + k, col * n + k);
            }
            b.swap(pivot, col);
        }
        for row in col + 1..n {
            let factor = a[row * n + col] / a[col * n + col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row * n + k] -= factor * a[col * n + k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail = (row + 1..n).map(|k| a[row * n + k] * x[k]).sum::<f64>();
        x[row] = (b[row] - tail) / a[row * n + row];
    }
    Some(x)
}
