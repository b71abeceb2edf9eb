mod activation;
mod binary;
mod continuous;
mod dense;
mod dropout;
mod input;
mod multiclass;

use std::fmt;

use ndarray::{Array2, ArrayView2, ArrayViewD};
use ndarray_rand::rand::rngs::StdRng;

use crate::{
    data::Labels,
    error::Result,
    optimizer::Optimizer,
    param::{ParamId, ParamIds},
};

pub use activation::Activation;
pub use binary::Binary;
pub use continuous::Continuous;
pub use dense::Dense;
pub use dropout::Dropout;
pub use input::Input;
pub use multiclass::Multiclass;

/// Decoded network output, one entry per sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    Labels(Vec<String>),
    Values(Vec<f64>),
}

/// Layers between the input and the output.
///
/// Every hidden layer keeps whatever it needs from its last `forward` call to
/// compute `back`.
#[derive(Debug, Clone)]
pub enum Hidden {
    Dense(Dense),
    Activation(Activation),
    Dropout(Dropout),
}

impl Hidden {
    /// Allocate parameters for `fan_in` inputs and return the output width.
    pub fn initialize(&mut self, fan_in: usize, ids: &mut ParamIds, rng: &mut StdRng) -> Result<usize> {
        match self {
            Self::Dense(layer) => layer.initialize(fan_in, ids, rng),
            Self::Activation(layer) => layer.initialize(fan_in),
            Self::Dropout(layer) => layer.initialize(fan_in, rng),
        }
    }

    /// Training-time forward pass.
    pub fn forward(&mut self, input: Array2<f64>) -> Result<Array2<f64>> {
        match self {
            Self::Dense(layer) => layer.forward(input),
            Self::Activation(layer) => layer.forward(input),
            Self::Dropout(layer) => layer.forward(input),
        }
    }

    /// Inference-time forward pass. Never mutates the layer.
    pub fn infer(&self, input: ArrayView2<f64>) -> Result<Array2<f64>> {
        match self {
            Self::Dense(layer) => layer.infer(input),
            Self::Activation(layer) => layer.infer(input),
            Self::Dropout(layer) => layer.infer(input),
        }
    }

    /// Consume the gradient of the loss with respect to this layer's output,
    /// update parameters and return the gradient with respect to its input.
    pub fn back(&mut self, gradient: Array2<f64>, optimizer: &mut dyn Optimizer) -> Result<Array2<f64>> {
        match self {
            Self::Dense(layer) => layer.back(gradient, optimizer),
            Self::Activation(layer) => layer.back(gradient),
            Self::Dropout(layer) => layer.back(gradient),
        }
    }

    pub fn num_params(&self) -> usize {
        match self {
            Self::Dense(layer) => layer.num_params(),
            Self::Activation(_) | Self::Dropout(_) => 0,
        }
    }

    pub fn parameters(&self) -> Vec<(ParamId, ArrayViewD<'_, f64>)> {
        match self {
            Self::Dense(layer) => layer.parameters(),
            Self::Activation(_) | Self::Dropout(_) => Vec::new(),
        }
    }
}

impl From<Dense> for Hidden {
    fn from(layer: Dense) -> Self {
        Self::Dense(layer)
    }
}

impl From<Activation> for Hidden {
    fn from(layer: Activation) -> Self {
        Self::Activation(layer)
    }
}

impl From<Dropout> for Hidden {
    fn from(layer: Dropout) -> Self {
        Self::Dropout(layer)
    }
}

impl fmt::Display for Hidden {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dense(layer) => fmt::Display::fmt(layer, f),
            Self::Activation(layer) => fmt::Display::fmt(layer, f),
            Self::Dropout(layer) => fmt::Display::fmt(layer, f),
        }
    }
}

/// Final layer: turns raw activations into a distribution or values, and
/// computes the loss and its gradient against encoded labels.
#[derive(Debug, Clone)]
pub enum Output {
    Multiclass(Multiclass),
    Binary(Binary),
    Continuous(Continuous),
}

impl Output {
    pub fn initialize(&mut self, fan_in: usize) -> Result<()> {
        match self {
            Self::Multiclass(layer) => layer.initialize(fan_in),
            Self::Binary(layer) => layer.initialize(fan_in),
            Self::Continuous(layer) => layer.initialize(fan_in),
        }
    }

    /// Encode labels as the target matrix compared with the layer output.
    pub fn encode(&self, labels: &Labels) -> Result<Array2<f64>> {
        match self {
            Self::Multiclass(layer) => layer.encode(labels),
            Self::Binary(layer) => layer.encode(labels),
            Self::Continuous(layer) => layer.encode(labels),
        }
    }

    pub fn forward(&mut self, input: Array2<f64>) -> Result<Array2<f64>> {
        match self {
            Self::Multiclass(layer) => layer.forward(input),
            Self::Binary(layer) => layer.forward(input),
            Self::Continuous(layer) => layer.forward(input),
        }
    }

    pub fn infer(&self, input: ArrayView2<f64>) -> Result<Array2<f64>> {
        match self {
            Self::Multiclass(layer) => layer.infer(input),
            Self::Binary(layer) => layer.infer(input),
            Self::Continuous(layer) => layer.infer(input),
        }
    }

    /// Batch-mean loss of the last forward pass against `expected`, and its
    /// gradient with respect to this layer's input.
    pub fn back(&mut self, expected: ArrayView2<f64>) -> Result<(f64, Array2<f64>)> {
        match self {
            Self::Multiclass(layer) => layer.back(expected),
            Self::Binary(layer) => layer.back(expected),
            Self::Continuous(layer) => layer.back(expected),
        }
    }

    pub fn decode(&self, computed: ArrayView2<f64>) -> Predictions {
        match self {
            Self::Multiclass(layer) => layer.decode(computed),
            Self::Binary(layer) => layer.decode(computed),
            Self::Continuous(layer) => layer.decode(computed),
        }
    }
}

impl From<Multiclass> for Output {
    fn from(layer: Multiclass) -> Self {
        Self::Multiclass(layer)
    }
}

impl From<Binary> for Output {
    fn from(layer: Binary) -> Self {
        Self::Binary(layer)
    }
}

impl From<Continuous> for Output {
    fn from(layer: Continuous) -> Self {
        Self::Continuous(layer)
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Multiclass(layer) => fmt::Display::fmt(layer, f),
            Self::Binary(layer) => fmt::Display::fmt(layer, f),
            Self::Continuous(layer) => fmt::Display::fmt(layer, f),
        }
    }
}

/// A borrowed layer of a network, in chain order.
#[derive(Debug, Clone, Copy)]
pub enum LayerRef<'a> {
    Input(&'a Input),
    Hidden(&'a Hidden),
    Output(&'a Output),
}

impl fmt::Display for LayerRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(layer) => fmt::Display::fmt(layer, f),
            Self::Hidden(layer) => fmt::Display::fmt(layer, f),
            Self::Output(layer) => fmt::Display::fmt(layer, f),
        }
    }
}
