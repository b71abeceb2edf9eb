use std::fmt;

use ndarray::{Array2, ArrayView2, Axis, Zip};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Smallest probability fed to a logarithm.
const EPSILON: f64 = 1e-12;

/// Loss functionals over a batch of (output, target) rows.
///
/// `compute` returns the mean over samples of the per-sample loss.
/// `differentiate` returns the derivative of the per-sample loss with respect to
/// each output, without dividing by the batch size.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CostFunction {
    /// `-sum(t * ln(p))`, for probability outputs.
    CrossEntropy,
    /// `sum((o - t)^2) / 2`.
    LeastSquares,
    /// Pseudo-Huber loss, quadratic near zero and linear beyond `alpha`.
    Huber { alpha: f64 },
}

impl CostFunction {
    pub fn huber(alpha: f64) -> Result<Self> {
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(Error::Configuration(format!(
                "huber alpha must be finite and > 0, got {alpha}"
            )));
        }
        Ok(Self::Huber { alpha })
    }

    pub fn validate(self) -> Result<Self> {
        match self {
            Self::Huber { alpha } => Self::huber(alpha),
            other => Ok(other),
        }
    }

    pub fn compute(&self, output: ArrayView2<f64>, target: ArrayView2<f64>) -> f64 {
        debug_assert_eq!(output.shape(), target.shape());

        let batch_size = output.len_of(Axis(0)).max(1);
        let total = match *self {
            Self::CrossEntropy => Zip::from(&output)
                .and(&target)
                .fold(0.0, |loss, &p, &t| loss - t * p.max(EPSILON).ln()),
            Self::LeastSquares => {
                Zip::from(&output)
                    .and(&target)
                    .fold(0.0, |loss, &o, &t| loss + (o - t).powi(2))
                    / 2.0
            }
            Self::Huber { alpha } => {
                let alpha_squared = alpha * alpha;
                Zip::from(&output).and(&target).fold(0.0, |loss, &o, &t| {
                    let z = (o - t) / alpha;
                    loss + alpha_squared * ((1.0 + z * z).sqrt() - 1.0)
                })
            }
        };
        total / batch_size as f64
    }

    pub fn differentiate(&self, output: ArrayView2<f64>, target: ArrayView2<f64>) -> Array2<f64> {
        debug_assert_eq!(output.shape(), target.shape());

        match *self {
            Self::CrossEntropy => Zip::from(&output)
                .and(&target)
                .map_collect(|&p, &t| -t / p.max(EPSILON)),
            Self::LeastSquares => &output - &target,
            Self::Huber { alpha } => Zip::from(&output).and(&target).map_collect(|&o, &t| {
                let d = o - t;
                let z = d / alpha;
                d / (1.0 + z * z).sqrt()
            }),
        }
    }
}

impl fmt::Display for CostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CrossEntropy => write!(f, "Cross Entropy"),
            Self::LeastSquares => write!(f, "Least Squares"),
            Self::Huber { alpha } => write!(f, "Huber (alpha: {alpha})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::assert_rel_eq_arr2;

    use super::*;

    use approx::assert_relative_eq;
    use ndarray::arr2;

    #[test]
    fn compute_least_squares() {
        let output = arr2(&[[1.0, 0.5, -0.1], [0.5, 0.2, 1.0]]);
        let target = arr2(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let cost = CostFunction::LeastSquares;
        assert_relative_eq!(
            0.5375,
            cost.compute(output.view(), target.view()),
            epsilon = 1e-12
        );
        assert_rel_eq_arr2!(
            cost.differentiate(output.view(), target.view()),
            arr2(&[[0.0, 0.5, -0.1], [0.5, -0.8, 1.0]])
        );
    }

    #[test]
    fn compute_cross_entropy() {
        let output = arr2(&[[0.7, 0.2, 0.1], [0.1, 0.3, 0.6]]);
        let target = arr2(&[[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let cost = CostFunction::CrossEntropy;
        assert_relative_eq!(
            0.43375028385236153,
            cost.compute(output.view(), target.view()),
            epsilon = 1e-12
        );
        assert_rel_eq_arr2!(
            cost.differentiate(output.view(), target.view()),
            arr2(&[[-1.0 / 0.7, 0.0, 0.0], [0.0, 0.0, -1.0 / 0.6]])
        );
    }

    #[test]
    fn cross_entropy_is_finite_at_zero_probability() {
        let output = arr2(&[[0.0, 1.0]]);
        let target = arr2(&[[1.0, 0.0]]);
        let loss = CostFunction::CrossEntropy.compute(output.view(), target.view());
        assert!(loss.is_finite());
        assert!(loss > 0.0);
    }

    #[test]
    fn compute_huber() {
        let output = arr2(&[[1.0, -2.0]]);
        let target = arr2(&[[0.0, 0.0]]);
        let cost = CostFunction::huber(1.0).unwrap();
        assert_relative_eq!(
            1.6502815398728847,
            cost.compute(output.view(), target.view()),
            epsilon = 1e-12
        );
        assert_rel_eq_arr2!(
            cost.differentiate(output.view(), target.view()),
            arr2(&[[1.0 / 2.0f64.sqrt(), -2.0 / 5.0f64.sqrt()]])
        );
    }

    #[test]
    fn huber_rejects_non_positive_alpha() {
        assert!(matches!(
            CostFunction::huber(0.0),
            Err(Error::Configuration(_))
        ));
    }
}
