mod adam;
mod momentum;
mod stochastic;

use std::fmt;

use ndarray::ArrayD;

use crate::{
    error::{Error, Result},
    param::ParamId,
};

pub use adam::Adam;
pub use momentum::Momentum;
pub use stochastic::Stochastic;

/// Trait to abstract update rules that turn a gradient into a parameter step.
///
/// Any state is keyed by [`ParamId`] and never shared between two parameters.
pub trait Optimizer: fmt::Debug + fmt::Display + Send {
    /// Register a parameter of the given shape before the first step.
    fn warm(&mut self, _id: ParamId, _shape: &[usize]) {}

    /// Return the step to subtract from the parameter `id` given its gradient.
    fn step(&mut self, id: ParamId, gradient: ArrayD<f64>) -> Result<ArrayD<f64>>;

    /// Discard all accumulated state.
    fn reset(&mut self) {}
}

pub(crate) fn validate_rate(rate: f64) -> Result<f64> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(Error::Configuration(format!(
            "learning rate must be finite and > 0, got {rate}"
        )));
    }
    Ok(rate)
}

pub(crate) fn validate_decay(name: &str, decay: f64) -> Result<f64> {
    if !(decay.is_finite() && (0.0..1.0).contains(&decay)) {
        return Err(Error::Configuration(format!(
            "{name} must be finite and in [0, 1), got {decay}"
        )));
    }
    Ok(decay)
}

pub(crate) fn check_shape(id: ParamId, expected: &[usize], gradient: &ArrayD<f64>) -> Result<()> {
    if expected != gradient.shape() {
        return Err(Error::shape(
            format!("gradient of shape {expected:?} for parameter {id}"),
            format!("{:?}", gradient.shape()),
        ));
    }
    Ok(())
}
