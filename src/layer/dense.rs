use std::fmt;

use ndarray::{Array1, Array2, ArrayView2, ArrayViewD, Axis, Ix1, Ix2};
use ndarray_rand::rand::rngs::StdRng;

use crate::{
    error::{Error, Result},
    init::Initializer,
    optimizer::Optimizer,
    param::{ParamId, ParamIds, Parameter},
};

/// Fully connected layer computing `X · Wᵀ + b` for a batch `X` of rows.
///
/// Weights have shape `(neurons, fan_in)` and biases `(neurons,)`. Both are
/// allocated by `initialize`.
#[derive(Debug, Clone)]
pub struct Dense {
    neurons: usize,
    l2_penalty: f64,
    bias: bool,
    weight_initializer: Initializer,
    bias_initializer: Initializer,
    weights: Option<Parameter<Ix2>>,
    biases: Option<Parameter<Ix1>>,
    input: Option<Array2<f64>>,
}

impl Dense {
    pub fn new(neurons: usize) -> Result<Self> {
        if neurons == 0 {
            return Err(Error::Configuration(
                "dense layer needs at least 1 neuron".to_string(),
            ));
        }
        Ok(Self {
            neurons,
            l2_penalty: 0.0,
            bias: true,
            weight_initializer: Initializer::Xavier,
            bias_initializer: Initializer::Constant { value: 0.0 },
            weights: None,
            biases: None,
            input: None,
        })
    }

    /// Add `l2_penalty * W` to the weight gradient.
    pub fn with_l2_penalty(self, l2_penalty: f64) -> Result<Self> {
        if !(l2_penalty.is_finite() && l2_penalty >= 0.0) {
            return Err(Error::Configuration(format!(
                "l2 penalty must be finite and non-negative, got {l2_penalty}"
            )));
        }
        Ok(Self { l2_penalty, ..self })
    }

    pub fn with_bias(self, bias: bool) -> Self {
        Self { bias, ..self }
    }

    pub fn with_initializers(self, weights: Initializer, biases: Initializer) -> Result<Self> {
        Ok(Self {
            weight_initializer: weights.validate()?,
            bias_initializer: biases.validate()?,
            ..self
        })
    }

    pub fn weights(&self) -> Option<&Array2<f64>> {
        self.weights.as_ref().map(Parameter::value)
    }

    pub fn biases(&self) -> Option<&Array1<f64>> {
        self.biases.as_ref().map(Parameter::value)
    }

    pub fn initialize(&mut self, fan_in: usize, ids: &mut ParamIds, rng: &mut StdRng) -> Result<usize> {
        let weights =
            self.weight_initializer
                .initialize((self.neurons, fan_in), fan_in, self.neurons, rng)?;
        self.weights = Some(Parameter::new(ids.next_id(), weights));

        self.biases = if self.bias {
            let biases = self
                .bias_initializer
                .initialize(self.neurons, fan_in, self.neurons, rng)?;
            Some(Parameter::new(ids.next_id(), biases))
        } else {
            None
        };
        self.input = None;

        Ok(self.neurons)
    }

    pub fn forward(&mut self, input: Array2<f64>) -> Result<Array2<f64>> {
        let output = self.infer(input.view())?;
        self.input = Some(input);
        Ok(output)
    }

    pub fn infer(&self, input: ArrayView2<f64>) -> Result<Array2<f64>> {
        let weights = self.weights.as_ref().ok_or(Error::NotInitialized)?.value();
        if input.ncols() != weights.ncols() {
            return Err(Error::shape(
                format!("{} inputs", weights.ncols()),
                format!("{} inputs", input.ncols()),
            ));
        }

        let mut output = input.dot(&weights.t());
        if let Some(biases) = &self.biases {
            output += biases.value();
        }
        Ok(output)
    }

    pub fn back(&mut self, gradient: Array2<f64>, optimizer: &mut dyn Optimizer) -> Result<Array2<f64>> {
        let input = self
            .input
            .take()
            .ok_or_else(|| Error::Configuration("backward pass before a forward pass".into()))?;
        let weights = self.weights.as_mut().ok_or(Error::NotInitialized)?;

        // Uses the weights from before this step.
        let input_gradient = gradient.dot(weights.value());

        let mut weights_gradient = gradient.t().dot(&input);
        if self.l2_penalty > 0.0 {
            weights_gradient.scaled_add(self.l2_penalty, weights.value());
        }
        let step = optimizer.step(weights.id(), weights_gradient.into_dyn())?;
        weights.update(step)?;

        if let Some(biases) = self.biases.as_mut() {
            let biases_gradient = gradient.sum_axis(Axis(0));
            let step = optimizer.step(biases.id(), biases_gradient.into_dyn())?;
            biases.update(step)?;
        }

        Ok(input_gradient)
    }

    pub fn num_params(&self) -> usize {
        self.weights.as_ref().map_or(0, Parameter::len) + self.biases.as_ref().map_or(0, Parameter::len)
    }

    pub fn parameters(&self) -> Vec<(ParamId, ArrayViewD<'_, f64>)> {
        let weights = self.weights.iter().map(|w| (w.id(), w.view_dyn()));
        let biases = self.biases.iter().map(|b| (b.id(), b.view_dyn()));
        weights.chain(biases).collect()
    }

    #[cfg(test)]
    pub(crate) fn with_weights(
        mut self,
        weights: Array2<f64>,
        biases: Array1<f64>,
        ids: &mut ParamIds,
    ) -> Self {
        self.weights = Some(Parameter::new(ids.next_id(), weights));
        self.biases = Some(Parameter::new(ids.next_id(), biases));
        self
    }
}

impl fmt::Display for Dense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dense (neurons: {}, l2 penalty: {}, bias: {})",
            self.neurons, self.l2_penalty, self.bias
        )
    }
}
