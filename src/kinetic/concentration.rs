use nalgebra::{DMatrix, DVector};

use crate::error::NumericalError;
use crate::kinetic::eigen::EigenDecomposition;

/// Expansion coefficients `γ = V⁻¹ c0` of the initial concentrations in the eigenbasis.
///
/// Solved through an LU factorisation; a singular eigenvector matrix is a
/// [`NumericalError::SingularEigenvectors`].
pub fn gamma(
    label: &str,
    eigen: &EigenDecomposition,
    initial: &DVector<f64>,
) -> Result<DVector<f64>, NumericalError> {
    let singular = || NumericalError::SingularEigenvectors {
        label: label.to_string(),
    };
    if eigen.reciprocal_condition() < f64::EPSILON {
        return Err(singular());
    }
    let gamma = eigen
        .eigenvectors
        .clone()
        .lu()
        .solve(initial)
        .ok_or_else(singular)?;
    if gamma.iter().any(|g| !g.is_finite()) {
        return Err(singular());
    }
    Ok(gamma)
}

/// Transform from eigenmode amplitudes to species concentrations.
///
/// Row `j` is `V[:, j] · γ[j]`, so `C[j, i]` is the amplitude of mode `j` in
/// species `i`. This is also the amplitude ("A") matrix of the scheme.
pub fn concentration_transform(eigen: &EigenDecomposition, gamma: &DVector<f64>) -> DMatrix<f64> {
    let n = eigen.len();
    DMatrix::from_fn(n, n, |j, i| eigen.eigenvectors[(i, j)] * gamma[j])
}

/// Replaces eigenmode columns by species concentration columns.
///
/// `modes` has one column per eigenmode, in the order of `eigen`; `initial`
/// must already be ordered like the compartments of the same rate matrix.
pub fn project_concentrations(
    label: &str,
    modes: &DMatrix<f64>,
    eigen: &EigenDecomposition,
    initial: &DVector<f64>,
) -> Result<DMatrix<f64>, NumericalError> {
    let gamma = gamma(label, eigen, initial)?;
    Ok(modes * concentration_transform(eigen, &gamma))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sequential() -> EigenDecomposition {
        let k = DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 1.0, -0.2]);
        EigenDecomposition::from_rate_matrix("seq", &k).unwrap()
    }

    #[test]
    fn test_gamma_reconstructs_initial_concentration() {
        let eigen = sequential();
        let c0 = DVector::from_vec(vec![1.0, 0.0]);
        let g = gamma("seq", &eigen, &c0).unwrap();
        assert_relative_eq!(&eigen.eigenvectors * g, c0, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_rows_sum_to_initial_concentration_at_time_zero() {
        // at t = 0 every mode is 1, so concentrations equal c0
        let eigen = sequential();
        let c0 = DVector::from_vec(vec![0.3, 0.7]);
        let modes = DMatrix::from_element(1, 2, 1.0);
        let projected = project_concentrations("seq", &modes, &eigen, &c0).unwrap();
        assert_relative_eq!(projected[(0, 0)], 0.3, epsilon = 1e-12);
        assert_relative_eq!(projected[(0, 1)], 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_initial_eigenvector_gives_single_mode() {
        let eigen = sequential();
        // c0 along the slow eigenvector: only B, decaying with rate 0.2
        let c0 = eigen.eigenvectors.column(1).clone_owned() * 2.0;
        let g = gamma("seq", &eigen, &c0).unwrap();
        assert_relative_eq!(g[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(g[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_singular_eigenvectors() {
        let eigen = EigenDecomposition {
            rates: DVector::from_vec(vec![1.0, 1.0]),
            eigenvectors: DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 0.0]),
        };
        let err = gamma("bad", &eigen, &DVector::from_vec(vec![1.0, 0.0])).unwrap_err();
        assert_eq!(
            err,
            NumericalError::SingularEigenvectors {
                label: "bad".to_string()
            }
        );
    }
}
