//! Quadratic least squares through the normal equations.
//!
//! The abscissae are centred and scaled to `t = (x - mean) / halfwidth` before
//! the normal matrix is formed, so its entries stay within a few orders of
//! magnitude of each other. The solution in `t` is then expanded back into the
//! coefficients of `x`. Both bases span the same column space, so the fit
//! minimises the same residual sum of squares.

use crate::domain::model::CalibrationError;

/// A Cholesky pivot must keep at least this fraction of its diagonal entry.
pub const PIVOT_TOLERANCE: f64 = 1e-10;

type Matrix3 = [[f64; 3]; 3];

/// Returns `[a, b, c]` minimising `sum (a*x^2 + b*x + c - y)^2`.
///
/// Callers are expected to pass equal-length, finite inputs.
pub fn fit_quadratic(xs: &[f64], ys: &[f64]) -> Result<[f64; 3], CalibrationError> {
    debug_assert_eq!(xs.len(), ys.len());

    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let halfwidth = xs.iter().map(|x| (x - mean).abs()).fold(0.0, f64::max);
    if !(halfwidth > 0.0) || !halfwidth.is_finite() {
        return Err(CalibrationError::SingularSystem);
    }

    let mut normal: Matrix3 = [[0.0; 3]; 3];
    let mut rhs = [0.0; 3];
    for (&x, &y) in xs.iter().zip(ys) {
        let t = (x - mean) / halfwidth;
        let row = [t * t, t, 1.0];
        for i in 0..3 {
            for j in 0..3 {
                normal[i][j] += row[i] * row[j];
            }
            rhs[i] += row[i] * y;
        }
    }

    let [p, q, r] = cholesky_solve(&normal, &rhs).ok_or(CalibrationError::SingularSystem)?;

    // y = p*t^2 + q*t + r with t = (x - m) / s
    let (m, s) = (mean, halfwidth);
    let s2 = s * s;
    let a = p / s2;
    let b = q / s - 2.0 * p * m / s2;
    let c = p * m * m / s2 - q * m / s + r;

    if a.is_finite() && b.is_finite() && c.is_finite() {
        Ok([a, b, c])
    } else {
        Err(CalibrationError::SingularSystem)
    }
}

/// Solves `m * x = rhs` for symmetric positive-definite `m` via `L * L^T`.
///
/// Returns `None` when `m` is not (numerically) positive-definite.
fn cholesky_solve(m: &Matrix3, rhs: &[f64; 3]) -> Option<[f64; 3]> {
    let mut l: Matrix3 = [[0.0; 3]; 3];

    for j in 0..3 {
        let mut pivot = m[j][j];
        for k in 0..j {
            pivot -= l[j][k] * l[j][k];
        }
        // NaN fails this comparison too
        if !(pivot > PIVOT_TOLERANCE * m[j][j]) || !(pivot > 0.0) {
            return None;
        }
        l[j][j] = pivot.sqrt();

        for i in (j + 1)..3 {
            let mut sum = m[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            l[i][j] = sum / l[j][j];
        }
    }

    // L * z = rhs
    let mut z = [0.0; 3];
    for i in 0..3 {
        let mut sum = rhs[i];
        for k in 0..i {
            sum -= l[i][k] * z[k];
        }
        z[i] = sum / l[i][i];
    }

    // L^T * x = z
    let mut x = [0.0; 3];
    for i in (0..3).rev() {
        let mut sum = z[i];
        for k in (i + 1)..3 {
            sum -= l[k][i] * x[k];
        }
        x[i] = sum / l[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cholesky_solves_identity() {
        let m = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        let x = cholesky_solve(&m, &[3.0, -2.0, 0.5]).unwrap();
        assert_eq!(x, [3.0, -2.0, 0.5]);
    }

    #[test]
    fn test_cholesky_solves_spd_system() {
        // m = [[4,2,0],[2,5,1],[0,1,3]], x = [1,2,3] => rhs = [8,15,11]
        let m = [[4.0, 2.0, 0.0], [2.0, 5.0, 1.0], [0.0, 1.0, 3.0]];
        let x = cholesky_solve(&m, &[8.0, 15.0, 11.0]).unwrap();
        for (got, want) in x.iter().zip([1.0, 2.0, 3.0]) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cholesky_rejects_rank_deficient_matrix() {
        let m = [[1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]];
        assert!(cholesky_solve(&m, &[1.0, 1.0, 1.0]).is_none());
    }

    #[test]
    fn test_constant_abscissa_is_singular() {
        let xs = [5.0, 5.0, 5.0, 5.0];
        let ys = [1.0, 2.0, 3.0, 4.0];
        assert!(matches!(
            fit_quadratic(&xs, &ys),
            Err(CalibrationError::SingularSystem)
        ));
    }

    #[test]
    fn test_two_distinct_abscissae_are_singular() {
        let xs = [10.0, 10.0, 20.0, 20.0];
        let ys = [11.0, 12.0, 21.0, 22.0];
        assert!(matches!(
            fit_quadratic(&xs, &ys),
            Err(CalibrationError::SingularSystem)
        ));
    }

    #[test]
    fn test_fits_straight_line() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.0, 3.0, 5.0, 7.0];
        let [a, b, c] = fit_quadratic(&xs, &ys).unwrap();
        assert!(a.abs() < 1e-12);
        assert!((b - 2.0).abs() < 1e-12);
        assert!((c - 1.0).abs() < 1e-12);
    }
}
