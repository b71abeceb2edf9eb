use ndarray::{Array, Dimension, ShapeBuilder};
use ndarray_rand::{
    rand::Rng,
    rand_distr::{Normal, Uniform},
    RandomExt,
};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Schemes for drawing initial parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Initializer {
    /// Glorot uniform: `U(-l, l)` with `l = sqrt(6 / (fan_in + fan_out))`.
    Xavier,
    /// Glorot normal: `N(0, sqrt(2 / (fan_in + fan_out)))`.
    XavierNormal,
    /// `N(0, sqrt(2 / fan_in))`, suited to rectifiers.
    He,
    /// `U(-l, l)` with `l = sqrt(3 / fan_in)`.
    LeCun,
    Uniform { beta: f64 },
    Constant { value: f64 },
}

impl Default for Initializer {
    fn default() -> Self {
        Self::Xavier
    }
}

impl Initializer {
    pub fn validate(self) -> Result<Self> {
        match self {
            Self::Uniform { beta } if !(beta.is_finite() && beta > 0.0) => Err(
                Error::Configuration(format!("uniform beta must be finite and > 0, got {beta}")),
            ),
            Self::Constant { value } if !value.is_finite() => Err(Error::Configuration(
                format!("constant value must be finite, got {value}"),
            )),
            other => Ok(other),
        }
    }

    /// Draw a tensor of `shape` for a layer with the given fan-in and fan-out.
    pub fn initialize<Sh, D, R>(
        &self,
        shape: Sh,
        fan_in: usize,
        fan_out: usize,
        rng: &mut R,
    ) -> Result<Array<f64, D>>
    where
        Sh: ShapeBuilder<Dim = D>,
        D: Dimension,
        R: Rng + ?Sized,
    {
        if fan_in == 0 || fan_out == 0 {
            return Err(Error::Configuration(format!(
                "fan in and fan out must be positive, got {fan_in} and {fan_out}"
            )));
        }
        let (fan_in, fan_out) = (fan_in as f64, fan_out as f64);

        let tensor = match *self {
            Self::Xavier => {
                let limit = (6.0 / (fan_in + fan_out)).sqrt();
                Array::random_using(shape, Uniform::new(-limit, limit), rng)
            }
            Self::XavierNormal => {
                Array::random_using(shape, normal((2.0 / (fan_in + fan_out)).sqrt())?, rng)
            }
            Self::He => Array::random_using(shape, normal((2.0 / fan_in).sqrt())?, rng),
            Self::LeCun => {
                let limit = (3.0 / fan_in).sqrt();
                Array::random_using(shape, Uniform::new(-limit, limit), rng)
            }
            Self::Uniform { beta } => Array::random_using(shape, Uniform::new(-beta, beta), rng),
            Self::Constant { value } => Array::from_elem(shape, value),
        };
        Ok(tensor)
    }
}

fn normal(std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, std_dev).map_err(|e| Error::Configuration(e.to_string()))
}
