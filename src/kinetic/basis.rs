//! Exponential decay basis functions, with and without a Gaussian IRF.
//!
//! Evaluation is stateless: a [`BasisEvaluator`] is handed to the matrix
//! builder and writes into the caller's matrix through an explicit column
//! index vector.

use std::f64::consts::{PI, SQRT_2};

use nalgebra::DMatrix;
use statrs::function::erf::erfc;

use crate::model::irf::ResolvedGaussianIrf;

/// Evaluates decay modes into columns of a kinetic matrix.
///
/// Rows of `matrix` are time samples. `columns[i]` is the destination column
/// of the mode with rate `rates[i]`; values are added to what is already
/// there, so several K-matrices can contribute to the same column.
pub trait BasisEvaluator: Send + Sync {
    /// `scale · exp(-r t)` for `t ≥ 0`, zero before.
    fn decay(
        &self,
        matrix: &mut DMatrix<f64>,
        columns: &[usize],
        rates: &[f64],
        times: &[f64],
        scale: f64,
    );

    /// Exponential decays convolved with every component of a Gaussian IRF.
    fn decay_gaussian_irf(
        &self,
        matrix: &mut DMatrix<f64>,
        columns: &[usize],
        rates: &[f64],
        times: &[f64],
        irf: &ResolvedGaussianIrf,
    );
}

/// Closed-form evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticBasis;

impl BasisEvaluator for AnalyticBasis {
    fn decay(
        &self,
        matrix: &mut DMatrix<f64>,
        columns: &[usize],
        rates: &[f64],
        times: &[f64],
        scale: f64,
    ) {
        for (&column, &rate) in columns.iter().zip(rates) {
            for (row, &t) in times.iter().enumerate() {
                matrix[(row, column)] += scale * step_exponential(rate, t);
            }
        }
    }

    fn decay_gaussian_irf(
        &self,
        matrix: &mut DMatrix<f64>,
        columns: &[usize],
        rates: &[f64],
        times: &[f64],
        irf: &ResolvedGaussianIrf,
    ) {
        for (center, width, scale) in irf.components() {
            for (&column, &rate) in columns.iter().zip(rates) {
                for (row, &t) in times.iter().enumerate() {
                    let mut value = convolved_exponential(rate, t, center, width);
                    if let Some(period) = irf.backsweep_period {
                        value += backsweep(rate, t, center, width, period);
                    }
                    matrix[(row, column)] += scale * value;
                }
            }
        }
    }
}

/// `exp(-r t)` for `t ≥ 0`, zero before.
#[inline]
pub fn step_exponential(rate: f64, t: f64) -> f64 {
    if t >= 0.0 {
        (-rate * t).exp()
    } else {
        0.0
    }
}

/// One-sided exponential decay convolved with a normalised Gaussian.
///
/// `0.5 · exp(-r(t-μ) + r²σ²/2) · erfc(-(t-μ-rσ²)/(σ√2))`, evaluated through
/// the scaled complementary error function where the exponential factor
/// would overflow. A zero width is the unconvolved step exponential.
pub fn convolved_exponential(rate: f64, t: f64, center: f64, width: f64) -> f64 {
    if width <= 0.0 {
        return step_exponential(rate, t - center);
    }
    let alpha = rate * width / SQRT_2;
    let beta = (t - center) / (width * SQRT_2);
    let threshold = beta - alpha;
    if threshold < -1.0 {
        0.5 * (-beta * beta).exp() * erfcx(-threshold)
    } else {
        0.5 * erfc(-threshold) * (alpha * (alpha - 2.0 * beta)).exp()
    }
}

/// Signal left over from all previous excitation pulses of period `period`.
///
/// The pulse `n` periods back contributes `conv(t + nT)`. Once `t + T` is
/// past the IRF each of these is a pure exponential, so the sum over
/// `n ≥ 1` is the geometric series `conv(t + T) / (1 - exp(-rT))`.
/// Non-decaying modes have no periodic steady state and contribute nothing.
pub fn backsweep(rate: f64, t: f64, center: f64, width: f64, period: f64) -> f64 {
    if rate <= 0.0 || !period.is_finite() || period <= 0.0 {
        return 0.0;
    }
    convolved_exponential(rate, t + period, center, width) / (-(-rate * period).exp_m1())
}

/// Scaled complementary error function `exp(x²) · erfc(x)` for `x > 0`.
fn erfcx(x: f64) -> f64 {
    if x < 25.0 {
        (x * x).exp() * erfc(x)
    } else {
        // asymptotic expansion, relative error below 1e-9 for x ≥ 25
        let x2 = x * x;
        (1.0 - 0.5 / x2 + 0.75 / (x2 * x2) - 1.875 / (x2 * x2 * x2)) / (x * PI.sqrt())
    }
}

/// Unnormalised Gaussian `exp(-(t-μ)² / 2σ²)`.
#[inline]
pub fn gaussian(t: f64, center: f64, width: f64) -> f64 {
    let d = t - center;
    (-d * d / (2.0 * width * width)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn irf(center: f64, width: f64, period: Option<f64>) -> ResolvedGaussianIrf {
        ResolvedGaussianIrf {
            centers: vec![center],
            widths: vec![width],
            scales: vec![1.0],
            backsweep_period: period,
        }
    }

    #[test]
    fn test_decay_without_irf() {
        let times = [0.0, 1.0, 2.0, 3.0];
        let mut m = DMatrix::zeros(4, 1);
        AnalyticBasis.decay(&mut m, &[0], &[0.5], &times, 1.0);

        let expected = [1.0, 0.6065, 0.3679, 0.2231];
        for (row, e) in expected.iter().enumerate() {
            assert_relative_eq!(m[(row, 0)], e, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_decay_is_zero_before_time_zero() {
        let times = [-2.0, -0.5, 0.0, 0.5];
        let mut m = DMatrix::zeros(4, 1);
        AnalyticBasis.decay(&mut m, &[0], &[1.0], &times, 2.0);
        assert_eq!(m[(0, 0)], 0.0);
        assert_eq!(m[(1, 0)], 0.0);
        assert_relative_eq!(m[(2, 0)], 2.0);
        assert_relative_eq!(m[(3, 0)], 2.0 * (-0.5_f64).exp());
    }

    #[test]
    fn test_decay_writes_through_column_map() {
        let times = [0.0, 1.0];
        let mut m = DMatrix::zeros(2, 3);
        AnalyticBasis.decay(&mut m, &[2, 0], &[1.0, 0.0], &times, 1.0);

        assert_relative_eq!(m[(1, 2)], (-1.0_f64).exp());
        assert_relative_eq!(m[(1, 0)], 1.0);
        assert_eq!(m.column(1).sum(), 0.0);
    }

    #[test]
    fn test_zero_width_reduces_to_step_exponential() {
        let times: Vec<f64> = (-10..40).map(|i| i as f64 * 0.1).collect();
        let mut convolved = DMatrix::zeros(times.len(), 1);
        let mut plain = DMatrix::zeros(times.len(), 1);
        AnalyticBasis.decay_gaussian_irf(&mut convolved, &[0], &[0.7], &times, &irf(0.0, 0.0, None));
        AnalyticBasis.decay(&mut plain, &[0], &[0.7], &times, 1.0);
        assert_relative_eq!(convolved, plain, epsilon = 1e-12);
    }

    #[test]
    fn test_narrow_width_approaches_step_exponential() {
        for &t in &[0.5, 1.0, 3.0] {
            assert_relative_eq!(
                convolved_exponential(0.7, t, 0.0, 1e-4),
                (-0.7 * t).exp(),
                epsilon = 1e-6
            );
        }
        assert!(convolved_exponential(0.7, -0.5, 0.0, 1e-4) < 1e-12);
    }

    #[test]
    fn test_convolution_is_half_at_center_for_zero_rate() {
        assert_relative_eq!(convolved_exponential(0.0, 0.3, 0.3, 0.1), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_convolution_branches_agree() {
        // threshold = -1 is the switch between the two forms
        let (rate, center, width) = (2.0, 0.0, 0.5);
        let t_switch = center + width * SQRT_2 * (rate * width / SQRT_2 - 1.0);
        let below = convolved_exponential(rate, t_switch - 1e-9, center, width);
        let above = convolved_exponential(rate, t_switch + 1e-9, center, width);
        assert_relative_eq!(below, above, max_relative = 1e-7);
    }

    #[test]
    fn test_fast_rate_broad_irf_is_finite() {
        let value = convolved_exponential(1e4, -5.0, 0.0, 1.0);
        assert!(value.is_finite());
        assert!(value >= 0.0);
    }

    #[test]
    fn test_multi_component_irf_is_weighted_sum() {
        let times = [0.0, 0.5, 1.0, 2.0];
        let two = ResolvedGaussianIrf {
            centers: vec![0.0, 0.4],
            widths: vec![0.1, 0.2],
            scales: vec![0.7, 0.3],
            backsweep_period: None,
        };
        let mut m = DMatrix::zeros(4, 1);
        AnalyticBasis.decay_gaussian_irf(&mut m, &[0], &[1.2], &times, &two);

        for (row, &t) in times.iter().enumerate() {
            let expected = 0.7 * convolved_exponential(1.2, t, 0.0, 0.1)
                + 0.3 * convolved_exponential(1.2, t, 0.4, 0.2);
            assert_relative_eq!(m[(row, 0)], expected, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_backsweep_vanishes_for_infinite_period() {
        let times = [0.0, 1.0, 5.0];
        let mut with = DMatrix::zeros(3, 1);
        let mut without = DMatrix::zeros(3, 1);
        AnalyticBasis.decay_gaussian_irf(&mut with, &[0], &[0.5], &times, &irf(0.0, 0.1, Some(1e6)));
        AnalyticBasis.decay_gaussian_irf(&mut without, &[0], &[0.5], &times, &irf(0.0, 0.1, None));
        assert_relative_eq!(with, without, epsilon = 1e-12);
        assert_eq!(backsweep(0.5, 1.0, 0.0, 0.1, f64::INFINITY), 0.0);
    }

    #[test]
    fn test_backsweep_grows_as_period_shrinks() {
        let periods = [100.0, 50.0, 20.0, 10.0, 5.0];
        let values: Vec<f64> = periods
            .iter()
            .map(|&p| backsweep(0.1, 1.0, 0.0, 0.2, p))
            .collect();
        for pair in values.windows(2) {
            assert!(pair[1] > pair[0], "{:?}", values);
        }
    }

    #[test]
    fn test_backsweep_total_signal_is_periodic() {
        // total(t) = Σ_{n≥0} conv(t + nT), so total(t) - total(t + T) = conv(t)
        let (rate, center, width, period) = (0.3, 0.0, 0.1, 8.0);
        let total = |t: f64| {
            convolved_exponential(rate, t, center, width) + backsweep(rate, t, center, width, period)
        };
        for &t in &[0.5, 1.0, 3.0] {
            assert_relative_eq!(
                total(t) - total(t + period),
                convolved_exponential(rate, t, center, width),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_backsweep_ignores_non_decaying_modes() {
        assert_eq!(backsweep(0.0, 1.0, 0.0, 0.1, 10.0), 0.0);
        assert_eq!(backsweep(-0.1, 1.0, 0.0, 0.1, 10.0), 0.0);
    }

    #[test]
    fn test_gaussian() {
        assert_relative_eq!(gaussian(1.0, 1.0, 0.3), 1.0);
        assert_relative_eq!(gaussian(1.3, 1.0, 0.3), (-0.5_f64).exp(), epsilon = 1e-12);
    }
}
