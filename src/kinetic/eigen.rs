//! Eigen-decomposition of rate matrices.
//!
//! Rate matrices are not symmetric, so the eigenvalues come from the real
//! Schur form and each eigenvector is recovered as the null space of
//! `K - λI`. Only real parts are kept: physically valid rate networks have a
//! real spectrum, and a non-negligible imaginary part is reported as a warning
//! rather than rejected.

use nalgebra::{DMatrix, DVector, Schur};

use crate::error::NumericalError;

/// Relative size of an imaginary eigenvalue part that is still considered noise
const IMAGINARY_TOLERANCE: f64 = 1e-8;
/// Relative distance below which two eigenvalues are treated as one repeated value
const REPEATED_TOLERANCE: f64 = 1e-9;
/// Relative singular value of `K - λI` below which a direction counts as null space
const NULL_SPACE_TOLERANCE: f64 = 1e-12;
/// Relative residual `|Kv - λv|` above which an eigenvector is reported as inexact
const RESIDUAL_TOLERANCE: f64 = 1e-6;
/// Reciprocal condition number below which the eigenvector matrix is reported
const CONDITION_TOLERANCE: f64 = 1e-10;
const MAX_SCHUR_ITERATIONS: usize = 10_000;

/// Decay rates and eigenvectors of one rate matrix.
///
/// `rates[j]` and `eigenvectors.column(j)` describe the same mode, and mode
/// `j` is paired with compartment `j` of the rate matrix it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenDecomposition {
    pub rates: DVector<f64>,
    pub eigenvectors: DMatrix<f64>,
}

impl EigenDecomposition {
    /// Diagonalizes the dense rate matrix `k`.
    ///
    /// `label` only names the matrix in diagnostics.
    pub fn from_rate_matrix(label: &str, k: &DMatrix<f64>) -> Result<Self, NumericalError> {
        let n = k.nrows();
        if n == 0 {
            return Ok(Self {
                rates: DVector::zeros(0),
                eigenvectors: DMatrix::zeros(0, 0),
            });
        }

        let scale = k.amax().max(1.0);
        let eigenvalues = real_eigenvalues(label, k, scale)?;
        let eigenvalues = pair_with_diagonal(k, &eigenvalues);

        let mut eigenvectors = DMatrix::zeros(n, n);
        let mut inexact = 0;
        for (j, &lambda) in eigenvalues.iter().enumerate() {
            let multiplicity = eigenvalues[..j]
                .iter()
                .filter(|&&other| (other - lambda).abs() <= REPEATED_TOLERANCE * scale)
                .count();
            let v = null_vector(label, k, lambda, multiplicity, scale)?;
            if (k * &v - &v * lambda).norm() > RESIDUAL_TOLERANCE * scale {
                inexact += 1;
            }
            eigenvectors.set_column(j, &v);
        }

        if inexact > 0 {
            tracing::warn!(
                matrix = label,
                inexact,
                "rate matrix is not diagonalizable to working precision, concentrations are approximate"
            );
        }

        let decomposition = Self {
            rates: DVector::from_iterator(n, eigenvalues.iter().map(|l| -l)),
            eigenvectors,
        };
        let rcond = decomposition.reciprocal_condition();
        if rcond < CONDITION_TOLERANCE {
            tracing::warn!(
                matrix = label,
                rcond,
                "eigenvector matrix is ill-conditioned"
            );
        }
        Ok(decomposition)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Lifetimes `1 / rate` of each mode
    pub fn lifetimes(&self) -> DVector<f64> {
        self.rates.map(|r| 1.0 / r)
    }

    /// Ratio of the smallest to the largest singular value of the eigenvectors
    pub fn reciprocal_condition(&self) -> f64 {
        if self.is_empty() {
            return 1.0;
        }
        let singular = self.eigenvectors.clone().singular_values();
        let max = singular.max();
        if max == 0.0 {
            0.0
        } else {
            singular.min() / max
        }
    }
}

fn real_eigenvalues(label: &str, k: &DMatrix<f64>, scale: f64) -> Result<Vec<f64>, NumericalError> {
    let schur = Schur::try_new(k.clone(), f64::EPSILON, MAX_SCHUR_ITERATIONS).ok_or_else(|| {
        NumericalError::EigenDecomposition {
            label: label.to_string(),
            reason: "Schur decomposition did not converge".to_string(),
        }
    })?;
    let complex = schur.complex_eigenvalues();

    if complex.iter().any(|l| !l.re.is_finite() || !l.im.is_finite()) {
        return Err(NumericalError::EigenDecomposition {
            label: label.to_string(),
            reason: "non-finite eigenvalue".to_string(),
        });
    }

    let max_imaginary = complex.iter().map(|l| l.im.abs()).fold(0.0, f64::max);
    if max_imaginary > IMAGINARY_TOLERANCE * scale {
        tracing::warn!(
            matrix = label,
            max_imaginary,
            "discarding imaginary part of rate matrix eigenvalues"
        );
    }
    Ok(complex.iter().map(|l| l.re).collect())
}

/// Orders the eigenvalues so that entry `i` is the one closest to `K[i, i]`.
///
/// For networks without cycles the rate matrix is triangular up to a
/// permutation and this pairing is exact.
fn pair_with_diagonal(k: &DMatrix<f64>, eigenvalues: &[f64]) -> Vec<f64> {
    let mut unused: Vec<f64> = eigenvalues.to_vec();
    let mut paired = Vec::with_capacity(eigenvalues.len());
    for i in 0..k.nrows() {
        let diagonal = k[(i, i)];
        let (best, _) = unused
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |(best, distance), (j, l)| {
                let d = (l - diagonal).abs();
                if d < distance {
                    (j, d)
                } else {
                    (best, distance)
                }
            });
        paired.push(unused.swap_remove(best));
    }
    paired
}

/// Unit vector spanning the null space of `K - λI`.
///
/// The singular vector of the smallest singular value is used. Only when the
/// null space has more than one dimension does the `m`-th occurrence of a
/// repeated eigenvalue take the `m`-th smallest one, so repeated modes stay
/// linearly independent. Close but distinct eigenvalues each have a
/// one-dimensional null space and keep their own eigenvector. The sign is
/// fixed so the largest component is positive.
fn null_vector(
    label: &str,
    k: &DMatrix<f64>,
    lambda: f64,
    multiplicity: usize,
    scale: f64,
) -> Result<DVector<f64>, NumericalError> {
    let n = k.nrows();
    let shifted = k - DMatrix::identity(n, n) * lambda;
    let svd = shifted.svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| NumericalError::EigenDecomposition {
        label: label.to_string(),
        reason: "singular value decomposition failed".to_string(),
    })?;

    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&a, &b| svd.singular_values[a].total_cmp(&svd.singular_values[b]));
    let null_dimension = order
        .iter()
        .filter(|&&i| svd.singular_values[i] <= NULL_SPACE_TOLERANCE * scale)
        .count()
        .max(1);
    let row = order[multiplicity.min(null_dimension - 1)];

    let mut v: DVector<f64> = v_t.row(row).transpose();
    let norm = v.norm();
    if norm > 0.0 {
        v /= norm;
    }
    if v.iter().fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { *x } else { acc }) < 0.0 {
        v = -v;
    }
    Ok(v)
}
