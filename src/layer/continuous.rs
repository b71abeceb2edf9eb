use std::fmt;

use ndarray::{Array2, ArrayView2, Axis};

use crate::{
    cost::CostFunction,
    data::Labels,
    error::{Error, Result},
    layer::Predictions,
};

/// Identity output for regression on a single target value.
#[derive(Debug, Clone)]
pub struct Continuous {
    cost: CostFunction,
    initialized: bool,
    computed: Option<Array2<f64>>,
}

impl Continuous {
    pub fn new(cost: CostFunction) -> Result<Self> {
        if cost == CostFunction::CrossEntropy {
            return Err(Error::Configuration(
                "continuous output needs a regression cost function".to_string(),
            ));
        }
        Ok(Self {
            cost: cost.validate()?,
            initialized: false,
            computed: None,
        })
    }

    pub fn initialize(&mut self, fan_in: usize) -> Result<()> {
        if fan_in != 1 {
            return Err(Error::Configuration(format!(
                "continuous output needs 1 input, got {fan_in}"
            )));
        }
        self.initialized = true;
        self.computed = None;
        Ok(())
    }

    pub fn encode(&self, labels: &Labels) -> Result<Array2<f64>> {
        match labels {
            Labels::Continuous(values) => {
                if let Some(value) = values.iter().find(|v| !v.is_finite()) {
                    return Err(Error::LabelMismatch(format!(
                        "target values must be finite, got {value}"
                    )));
                }
                Array2::from_shape_vec((values.len(), 1), values.clone())
                    .map_err(|e| Error::shape(format!("{} targets", values.len()), e))
            }
            Labels::Categorical(_) => Err(Error::LabelMismatch(
                "continuous output needs continuous labels".to_string(),
            )),
        }
    }

    pub fn forward(&mut self, input: Array2<f64>) -> Result<Array2<f64>> {
        let computed = self.infer(input.view())?;
        self.computed = Some(computed.clone());
        Ok(computed)
    }

    pub fn infer(&self, input: ArrayView2<f64>) -> Result<Array2<f64>> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        Ok(input.to_owned())
    }

    pub fn back(&mut self, expected: ArrayView2<f64>) -> Result<(f64, Array2<f64>)> {
        let computed = self
            .computed
            .take()
            .ok_or_else(|| Error::Configuration("backward pass before a forward pass".into()))?;
        if computed.shape() != expected.shape() {
            return Err(Error::shape(
                format!("{:?} targets", computed.shape()),
                format!("{:?}", expected.shape()),
            ));
        }

        let batch_size = computed.len_of(Axis(0)) as f64;
        let loss = self.cost.compute(computed.view(), expected);
        let gradient = self.cost.differentiate(computed.view(), expected) / batch_size;
        Ok((loss, gradient))
    }

    pub fn decode(&self, computed: ArrayView2<f64>) -> Predictions {
        Predictions::Values(computed.column(0).to_vec())
    }
}

impl fmt::Display for Continuous {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Continuous (cost function: {})", self.cost)
    }
}

#[cfg(test)]
mod tests {
    use crate::assert_rel_eq_arr2;

    use super::*;

    use approx::assert_relative_eq;
    use ndarray::arr2;

    #[test]
    fn least_squares_back() {
        let mut layer = Continuous::new(CostFunction::LeastSquares).unwrap();
        layer.initialize(1).unwrap();
        let expected = layer.encode(&Labels::Continuous(vec![1.0, -1.0])).unwrap();

        layer.forward(arr2(&[[2.0], [0.0]])).unwrap();
        let (loss, gradient) = layer.back(expected.view()).unwrap();
        assert_relative_eq!(loss, 0.5);
        assert_rel_eq_arr2!(gradient, arr2(&[[0.5], [0.5]]));
    }

    #[test]
    fn cross_entropy_is_rejected() {
        assert!(matches!(
            Continuous::new(CostFunction::CrossEntropy),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn categorical_labels_are_rejected() {
        let layer = Continuous::new(CostFunction::LeastSquares).unwrap();
        assert!(matches!(
            layer.encode(&Labels::categorical(["a"])),
            Err(Error::LabelMismatch(_))
        ));
    }

    #[test]
    fn non_finite_targets_are_rejected() {
        let layer = Continuous::new(CostFunction::LeastSquares).unwrap();
        assert!(layer.encode(&Labels::Continuous(vec![f64::NAN])).is_err());
    }

    #[test]
    fn decode_returns_column() {
        let layer = Continuous::new(CostFunction::LeastSquares).unwrap();
        assert_eq!(
            layer.decode(arr2(&[[1.5], [-2.0]]).view()),
            Predictions::Values(vec![1.5, -2.0])
        );
    }
}
