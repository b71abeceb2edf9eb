use std::fmt;

use ndarray::ArrayD;

use crate::{error::Result, optimizer::Optimizer, param::ParamId};

use super::validate_rate;

/// Plain gradient descent with a fixed learning rate.
#[derive(Debug, Clone)]
pub struct Stochastic {
    rate: f64,
}

impl Stochastic {
    pub fn new(rate: f64) -> Result<Self> {
        Ok(Self {
            rate: validate_rate(rate)?,
        })
    }
}

impl Optimizer for Stochastic {
    fn step(&mut self, _id: ParamId, gradient: ArrayD<f64>) -> Result<ArrayD<f64>> {
        Ok(gradient * self.rate)
    }
}

impl fmt::Display for Stochastic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stochastic (rate: {})", self.rate)
    }
}
