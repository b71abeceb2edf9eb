use std::{collections::HashMap, fmt};

use ndarray::{ArrayD, Zip};

use crate::{
    error::{Error, Result},
    optimizer::Optimizer,
    param::ParamId,
};

use super::{check_shape, validate_decay, validate_rate};

/// Moving averages kept for one parameter tensor.
#[derive(Debug, Clone)]
struct Moments {
    first: ArrayD<f64>,
    second: ArrayD<f64>,
    steps: i32,
}

impl Moments {
    fn zeros(shape: &[usize]) -> Self {
        Self {
            first: ArrayD::zeros(shape),
            second: ArrayD::zeros(shape),
            steps: 0,
        }
    }
}

/// Adaptive moment estimation with bias-corrected moments.
///
/// The step counter used for bias correction is kept per parameter and advances
/// once per call to [`Optimizer::step`] for that parameter.
#[derive(Debug, Clone)]
pub struct Adam {
    rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    cache: HashMap<ParamId, Moments>,
}

impl Adam {
    pub fn new(rate: f64) -> Result<Self> {
        Ok(Self {
            rate: validate_rate(rate)?,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            cache: HashMap::new(),
        })
    }

    /// Decay rates of the first and second moment averages.
    pub fn with_betas(self, beta1: f64, beta2: f64) -> Result<Self> {
        Ok(Self {
            beta1: validate_decay("beta1", beta1)?,
            beta2: validate_decay("beta2", beta2)?,
            ..self
        })
    }

    pub fn with_epsilon(self, epsilon: f64) -> Result<Self> {
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(Error::Configuration(format!(
                "epsilon must be finite and > 0, got {epsilon}"
            )));
        }
        Ok(Self { epsilon, ..self })
    }
}

impl Optimizer for Adam {
    fn warm(&mut self, id: ParamId, shape: &[usize]) {
        self.cache.insert(id, Moments::zeros(shape));
    }

    fn step(&mut self, id: ParamId, gradient: ArrayD<f64>) -> Result<ArrayD<f64>> {
        let moments = self
            .cache
            .entry(id)
            .or_insert_with(|| Moments::zeros(gradient.shape()));
        check_shape(id, moments.first.shape(), &gradient)?;

        let (beta1, beta2) = (self.beta1, self.beta2);
        Zip::from(&mut moments.first)
            .and(&mut moments.second)
            .and(&gradient)
            .for_each(|m, v, &g| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
            });
        moments.steps += 1;

        let first_correction = 1.0 - beta1.powi(moments.steps);
        let second_correction = 1.0 - beta2.powi(moments.steps);
        let (rate, epsilon) = (self.rate, self.epsilon);
        Ok(Zip::from(&moments.first)
            .and(&moments.second)
            .map_collect(|&m, &v| {
                let m_hat = m / first_correction;
                let v_hat = v / second_correction;
                rate * m_hat / (v_hat.sqrt() + epsilon)
            }))
    }

    fn reset(&mut self) {
        self.cache.clear();
    }
}

impl fmt::Display for Adam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Adam (rate: {}, beta1: {}, beta2: {}, epsilon: {})",
            self.rate, self.beta1, self.beta2, self.epsilon
        )
    }
}
