use std::fmt;

use ndarray::{Array, ArrayD, ArrayViewD, Dimension};

use crate::error::{Error, Result};

/// Stable identity of a parameter tensor, assigned when a network is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(usize);

impl ParamId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out consecutive ids during one initialization sweep.
#[derive(Debug, Default)]
pub struct ParamIds {
    next: usize,
}

impl ParamIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ParamId {
        let id = ParamId(self.next);
        self.next += 1;
        id
    }
}

/// A learnable tensor owned by a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter<D: Dimension> {
    id: ParamId,
    value: Array<f64, D>,
}

impl<D: Dimension> Parameter<D> {
    pub fn new(id: ParamId, value: Array<f64, D>) -> Self {
        Self { id, value }
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn value(&self) -> &Array<f64, D> {
        &self.value
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn view_dyn(&self) -> ArrayViewD<'_, f64> {
        self.value.view().into_dyn()
    }

    /// Subtract an optimizer step from the value.
    pub fn update(&mut self, delta: ArrayD<f64>) -> Result<()> {
        if delta.shape() != self.value.shape() {
            return Err(Error::shape(
                format!("step of shape {:?}", self.value.shape()),
                format!("{:?} for parameter {}", delta.shape(), self.id),
            ));
        }
        let delta = delta
            .into_dimensionality::<D>()
            .map_err(|e| Error::shape(format!("{}-d step", D::NDIM.unwrap_or(0)), e))?;
        self.value -= &delta;
        Ok(())
    }
}
