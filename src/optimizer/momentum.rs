use std::{collections::HashMap, fmt};

use ndarray::ArrayD;

use crate::{error::Result, optimizer::Optimizer, param::ParamId};

use super::{check_shape, validate_decay, validate_rate};

/// Gradient descent with a velocity that accumulates past steps.
#[derive(Debug, Clone)]
pub struct Momentum {
    rate: f64,
    decay: f64,
    velocities: HashMap<ParamId, ArrayD<f64>>,
}

impl Momentum {
    pub fn new(rate: f64) -> Result<Self> {
        Ok(Self {
            rate: validate_rate(rate)?,
            decay: 0.9,
            velocities: HashMap::new(),
        })
    }

    /// Fraction of the previous velocity kept on each step.
    pub fn with_decay(self, decay: f64) -> Result<Self> {
        Ok(Self {
            decay: validate_decay("momentum decay", decay)?,
            ..self
        })
    }
}

impl Optimizer for Momentum {
    fn warm(&mut self, id: ParamId, shape: &[usize]) {
        self.velocities.insert(id, ArrayD::zeros(shape));
    }

    fn step(&mut self, id: ParamId, gradient: ArrayD<f64>) -> Result<ArrayD<f64>> {
        let velocity = self
            .velocities
            .entry(id)
            .or_insert_with(|| ArrayD::zeros(gradient.raw_dim()));
        check_shape(id, velocity.shape(), &gradient)?;

        *velocity *= self.decay;
        velocity.scaled_add(self.rate, &gradient);
        Ok(velocity.clone())
    }

    fn reset(&mut self) {
        self.velocities.clear();
    }
}

impl fmt::Display for Momentum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Momentum (rate: {}, decay: {})", self.rate, self.decay)
    }
}

#[cfg(test)]
mod tests {
    use crate::{assert_rel_eq_arr1, param::ParamIds};

    use super::*;

    use approx::assert_relative_eq;
    use ndarray::arr1;

    #[test]
    fn velocity_accumulates() {
        let mut ids = ParamIds::new();
        let id = ids.next_id();
        let mut opt = Momentum::new(0.1).unwrap().with_decay(0.5).unwrap();
        opt.warm(id, &[2]);

        let first = opt.step(id, arr1(&[1.0, -2.0]).into_dyn()).unwrap();
        assert_rel_eq_arr1!(first, arr1(&[0.1, -0.2]).into_dyn());

        let second = opt.step(id, arr1(&[1.0, -2.0]).into_dyn()).unwrap();
        assert_rel_eq_arr1!(second, arr1(&[0.15, -0.3]).into_dyn(), epsilon = 1e-12);
    }

    #[test]
    fn parameters_keep_separate_velocities() {
        let mut ids = ParamIds::new();
        let (a, b) = (ids.next_id(), ids.next_id());
        let mut opt = Momentum::new(1.0).unwrap();

        opt.step(a, arr1(&[1.0]).into_dyn()).unwrap();
        let step = opt.step(b, arr1(&[1.0]).into_dyn()).unwrap();
        assert_rel_eq_arr1!(step, arr1(&[1.0]).into_dyn());
    }

    #[test]
    fn rejects_gradient_of_other_shape() {
        let mut ids = ParamIds::new();
        let id = ids.next_id();
        let mut opt = Momentum::new(0.1).unwrap();
        opt.warm(id, &[2]);
        assert!(opt.step(id, arr1(&[1.0]).into_dyn()).is_err());
    }
}
