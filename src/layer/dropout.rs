use std::fmt;

use ndarray::{Array2, ArrayView2};
use ndarray_rand::{
    rand::{rngs::StdRng, Rng, SeedableRng},
    rand_distr::Uniform,
    RandomExt,
};

use crate::error::{Error, Result};

/// Zeroes a random fraction of activations during training and rescales the
/// rest so inference needs no correction.
#[derive(Debug, Clone)]
pub struct Dropout {
    ratio: f64,
    width: Option<usize>,
    rng: Option<StdRng>,
    mask: Option<Array2<f64>>,
}

impl Dropout {
    pub fn new(ratio: f64) -> Result<Self> {
        if !(ratio.is_finite() && 0.0 < ratio && ratio < 1.0) {
            return Err(Error::Configuration(format!(
                "dropout ratio must be in (0, 1), got {ratio}"
            )));
        }
        Ok(Self {
            ratio,
            width: None,
            rng: None,
            mask: None,
        })
    }

    pub fn initialize(&mut self, fan_in: usize, rng: &mut StdRng) -> Result<usize> {
        self.width = Some(fan_in);
        self.rng = Some(StdRng::seed_from_u64(rng.gen()));
        self.mask = None;
        Ok(fan_in)
    }

    pub fn forward(&mut self, input: Array2<f64>) -> Result<Array2<f64>> {
        let rng = self.rng.as_mut().ok_or(Error::NotInitialized)?;
        let (ratio, scale) = (self.ratio, 1.0 / (1.0 - self.ratio));
        let mask = Array2::random_using(input.raw_dim(), Uniform::new(0.0, 1.0), rng)
            .mapv(|u: f64| if u < ratio { 0.0 } else { scale });
        let output = input * &mask;
        self.mask = Some(mask);
        Ok(output)
    }

    pub fn infer(&self, input: ArrayView2<f64>) -> Result<Array2<f64>> {
        if self.width.is_none() {
            return Err(Error::NotInitialized);
        }
        Ok(input.to_owned())
    }

    pub fn back(&mut self, gradient: Array2<f64>) -> Result<Array2<f64>> {
        let mask = self
            .mask
            .take()
            .ok_or_else(|| Error::Configuration("backward pass before a forward pass".into()))?;
        Ok(gradient * &mask)
    }
}

impl fmt::Display for Dropout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dropout (ratio: {})", self.ratio)
    }
}
