use std::fmt;

use ndarray::{Array2, ArrayView2, Zip};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Elementwise activation functions.
///
/// `differentiate` receives both the input and the output of the forward pass.
/// Which of the two each function reads is noted on its variant.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivationFunction {
    /// Reads the input (derivative is constant).
    Identity,
    /// Reads the output: `s * (1 - s)`.
    Sigmoid,
    /// Reads the output: `1 - t^2`.
    HyperbolicTangent,
    /// Reads the input.
    Relu,
    /// Reads the input.
    LeakyRelu { leakage: f64 },
    /// Reads the input for the sign and the output for the negative branch.
    Elu { alpha: f64 },
    /// Reads the input.
    Softsign,
    /// Reads the input.
    Softplus,
    /// Reads the input.
    Silu,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl ActivationFunction {
    /// Leaky ReLU with the given slope for negative inputs.
    pub fn leaky_relu(leakage: f64) -> Result<Self> {
        if !(leakage.is_finite() && 0.0 < leakage && leakage < 1.0) {
            return Err(Error::Configuration(format!(
                "leakage must be in (0, 1), got {leakage}"
            )));
        }
        Ok(Self::LeakyRelu { leakage })
    }

    pub fn elu(alpha: f64) -> Result<Self> {
        if !(alpha.is_finite() && alpha >= 0.0) {
            return Err(Error::Configuration(format!(
                "alpha must be finite and non-negative, got {alpha}"
            )));
        }
        Ok(Self::Elu { alpha })
    }

    /// Check hyperparameters of a variant built directly or deserialized.
    pub fn validate(self) -> Result<Self> {
        match self {
            Self::LeakyRelu { leakage } => Self::leaky_relu(leakage),
            Self::Elu { alpha } => Self::elu(alpha),
            other => Ok(other),
        }
    }

    fn compute_one(&self, x: f64) -> f64 {
        match *self {
            Self::Identity => x,
            Self::Sigmoid => sigmoid(x),
            Self::HyperbolicTangent => x.tanh(),
            Self::Relu => x.max(0.0),
            Self::LeakyRelu { leakage } => {
                if x > 0.0 {
                    x
                } else {
                    leakage * x
                }
            }
            Self::Elu { alpha } => {
                if x > 0.0 {
                    x
                } else {
                    alpha * x.exp_m1()
                }
            }
            Self::Softsign => x / (1.0 + x.abs()),
            // Stable for large |x|.
            Self::Softplus => x.max(0.0) + (-x.abs()).exp().ln_1p(),
            Self::Silu => x * sigmoid(x),
        }
    }

    fn differentiate_one(&self, x: f64, y: f64) -> f64 {
        match *self {
            Self::Identity => 1.0,
            Self::Sigmoid => y * (1.0 - y),
            Self::HyperbolicTangent => 1.0 - y * y,
            Self::Relu => {
                if x > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::LeakyRelu { leakage } => {
                if x > 0.0 {
                    1.0
                } else {
                    leakage
                }
            }
            Self::Elu { alpha } => {
                if x > 0.0 {
                    1.0
                } else {
                    y + alpha
                }
            }
            Self::Softsign => 1.0 / (1.0 + x.abs()).powi(2),
            Self::Softplus => sigmoid(x),
            Self::Silu => {
                let s = sigmoid(x);
                s * (1.0 + x * (1.0 - s))
            }
        }
    }

    pub fn compute(&self, x: ArrayView2<f64>) -> Array2<f64> {
        x.map(|&v| self.compute_one(v))
    }

    /// Derivative of the function at `input`, where `output == compute(input)`.
    pub fn differentiate(&self, input: ArrayView2<f64>, output: ArrayView2<f64>) -> Array2<f64> {
        Zip::from(&input)
            .and(&output)
            .map_collect(|&x, &y| self.differentiate_one(x, y))
    }
}

impl fmt::Display for ActivationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "Identity"),
            Self::Sigmoid => write!(f, "Sigmoid"),
            Self::HyperbolicTangent => write!(f, "Hyperbolic Tangent"),
            Self::Relu => write!(f, "ReLU"),
            Self::LeakyRelu { leakage } => write!(f, "Leaky ReLU (leakage: {leakage})"),
            Self::Elu { alpha } => write!(f, "ELU (alpha: {alpha})"),
            Self::Softsign => write!(f, "Softsign"),
            Self::Softplus => write!(f, "Softplus"),
            Self::Silu => write!(f, "SiLU"),
        }
    }
}
