use std::fmt;

use ndarray::{Array2, ArrayView2};

use crate::{
    activation::ActivationFunction,
    error::{Error, Result},
};

/// Applies an activation function elementwise.
#[derive(Debug, Clone)]
pub struct Activation {
    function: ActivationFunction,
    width: Option<usize>,
    input: Option<Array2<f64>>,
    output: Option<Array2<f64>>,
}

impl Activation {
    pub fn new(function: ActivationFunction) -> Result<Self> {
        Ok(Self {
            function: function.validate()?,
            width: None,
            input: None,
            output: None,
        })
    }

    pub fn function(&self) -> ActivationFunction {
        self.function
    }

    pub fn initialize(&mut self, fan_in: usize) -> Result<usize> {
        self.width = Some(fan_in);
        self.input = None;
        self.output = None;
        Ok(fan_in)
    }

    pub fn forward(&mut self, input: Array2<f64>) -> Result<Array2<f64>> {
        let output = self.infer(input.view())?;
        self.input = Some(input);
        self.output = Some(output.clone());
        Ok(output)
    }

    pub fn infer(&self, input: ArrayView2<f64>) -> Result<Array2<f64>> {
        if self.width.is_none() {
            return Err(Error::NotInitialized);
        }
        Ok(self.function.compute(input))
    }

    pub fn back(&mut self, gradient: Array2<f64>) -> Result<Array2<f64>> {
        let (input, output) = self
            .input
            .take()
            .zip(self.output.take())
            .ok_or_else(|| Error::Configuration("backward pass before a forward pass".into()))?;
        Ok(gradient * self.function.differentiate(input.view(), output.view()))
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Activation (function: {})", self.function)
    }
}

#[cfg(test)]
mod tests {
    use crate::assert_rel_eq_arr2;

    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    #[test]
    fn relu_back_masks_gradient() {
        let mut layer = Activation::new(ActivationFunction::Relu).unwrap();
        layer.initialize(3).unwrap();
        let output = layer.forward(arr2(&[[-1.0, 0.5, 2.0]])).unwrap();
        assert_rel_eq_arr2!(output, arr2(&[[0.0, 0.5, 2.0]]));

        let gradient = layer.back(arr2(&[[3.0, 3.0, -1.0]])).unwrap();
        assert_rel_eq_arr2!(gradient, arr2(&[[0.0, 3.0, -1.0]]));
    }

    #[test]
    fn infer_requires_initialize() {
        let layer = Activation::new(ActivationFunction::Sigmoid).unwrap();
        assert_eq!(
            layer.infer(arr2(&[[1.0]]).view()),
            Err(Error::NotInitialized)
        );
    }

    #[test]
    fn back_requires_forward() {
        let mut layer = Activation::new(ActivationFunction::Sigmoid).unwrap();
        layer.initialize(1).unwrap();
        assert!(layer.back(arr2(&[[1.0]])).is_err());
    }
}
