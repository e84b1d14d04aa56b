//! Dense linear system solver.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Pivot singularity threshold. A pivot whose magnitude falls below this
/// value makes the system [`Error::Singular`].
pub const EPSILON: f64 = 1e-10;

/// Solve a linear system Ax = b by LU decomposition with partial row
/// pivoting.
///
/// The factorization is written out longhand so the pivot singularity
/// threshold is honored exactly; `epsilon` is usually [`EPSILON`].
pub fn solve_dense(a: &DMatrix<f64>, b: &DVector<f64>, epsilon: f64) -> Result<DVector<f64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(Error::Dimension {
            expected: n,
            actual: a.ncols(),
        });
    }
    if b.len() != n {
        return Err(Error::Dimension {
            expected: n,
            actual: b.len(),
        });
    }

    let mut lu = a.clone();
    let mut x = b.clone();

    for k in 0..n {
        // Partial pivoting: largest magnitude in the remaining column.
        let mut pivot_row = k;
        let mut pivot_mag = lu[(k, k)].abs();
        for i in (k + 1)..n {
            let mag = lu[(i, k)].abs();
            if mag > pivot_mag {
                pivot_mag = mag;
                pivot_row = i;
            }
        }

        if pivot_mag < epsilon {
            return Err(Error::Singular);
        }

        if pivot_row != k {
            lu.swap_rows(k, pivot_row);
            x.swap_rows(k, pivot_row);
        }

        let pivot = lu[(k, k)];
        for i in (k + 1)..n {
            let factor = lu[(i, k)] / pivot;
            if factor == 0.0 {
                continue;
            }
            for j in (k + 1)..n {
                lu[(i, j)] -= factor * lu[(k, j)];
            }
            x[i] -= factor * x[k];
        }
    }

    // Back substitution.
    for i in (0..n).rev() {
        let mut sum = x[i];
        for j in (i + 1)..n {
            sum -= lu[(i, j)] * x[j];
        }
        x[i] = sum / lu[(i, i)];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{dmatrix, dvector};

    #[test]
    fn test_solve_simple() {
        // 2x + y = 5
        // x + 3y = 6
        // Solution: x = 1.8, y = 1.4
        let a = dmatrix![2.0, 1.0; 1.0, 3.0];
        let b = dvector![5.0, 6.0];

        let x = solve_dense(&a, &b, EPSILON).unwrap();

        assert!((x[0] - 1.8).abs() < 1e-10);
        assert!((x[1] - 1.4).abs() < 1e-10);
    }

    #[test]
    fn test_pivoting_required() {
        // Zero on the leading diagonal forces a row swap.
        let a = dmatrix![0.0, 1.0; 1.0, 0.0];
        let b = dvector![2.0, 3.0];

        let x = solve_dense(&a, &b, EPSILON).unwrap();
        assert!((x[0] - 3.0).abs() < 1e-10);
        assert!((x[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_singular_matrix() {
        let a = dmatrix![1.0, 2.0; 2.0, 4.0]; // Row 2 = 2 * row 1
        let b = dvector![1.0, 2.0];

        let result = solve_dense(&a, &b, EPSILON);
        assert!(matches!(result, Err(Error::Singular)));
    }

    #[test]
    fn test_pivot_below_epsilon_is_singular() {
        let a = dmatrix![1e-12, 0.0; 0.0, 1e-12];
        let b = dvector![1.0, 1.0];

        assert!(matches!(solve_dense(&a, &b, EPSILON), Err(Error::Singular)));
        // A looser epsilon accepts the same system.
        assert!(solve_dense(&a, &b, 1e-15).is_ok());
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = dmatrix![1.0, 2.0; 3.0, 4.0];
        let b = dvector![1.0, 2.0, 3.0];

        let result = solve_dense(&a, &b, EPSILON);
        assert!(matches!(result, Err(Error::Dimension { .. })));
    }

    #[test]
    fn test_three_by_three() {
        let a = dmatrix![
            4.0, -1.0, 0.0;
            -1.0, 4.0, -1.0;
            0.0, -1.0, 4.0
        ];
        let expected = dvector![1.0, 2.0, 3.0];
        let b = &a * &expected;

        let x = solve_dense(&a, &b, EPSILON).unwrap();
        for i in 0..3 {
            assert!((x[i] - expected[i]).abs() < 1e-10);
        }
    }
}
