use std::vec;

use ndarray::{Array2, ArrayView2, Axis};
use ndarray_rand::rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::error::{Error, Result};

/// Training targets, one per sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Labels {
    Categorical(Vec<String>),
    Continuous(Vec<f64>),
}

impl Labels {
    pub fn categorical<L: Into<String>>(labels: impl IntoIterator<Item = L>) -> Self {
        Self::Categorical(labels.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Categorical(labels) => labels.len(),
            Self::Continuous(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, indices: &[usize]) -> Self {
        match self {
            Self::Categorical(labels) => {
                Self::Categorical(indices.iter().map(|&i| labels[i].clone()).collect())
            }
            Self::Continuous(values) => {
                Self::Continuous(indices.iter().map(|&i| values[i]).collect())
            }
        }
    }
}

/// Samples (one row each) paired with their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Labeled {
    samples: Array2<f64>,
    labels: Labels,
}

impl Labeled {
    pub fn new(samples: Array2<f64>, labels: Labels) -> Result<Self> {
        if samples.nrows() != labels.len() {
            return Err(Error::shape(
                format!("{} labels", samples.nrows()),
                format!("{} labels", labels.len()),
            ));
        }
        Ok(Self { samples, labels })
    }

    pub fn samples(&self) -> ArrayView2<'_, f64> {
        self.samples.view()
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn num_samples(&self) -> usize {
        self.samples.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            samples: self.samples.select(Axis(0), indices),
            labels: self.labels.select(indices),
        }
    }

    /// Create a minibatch generator over `indices`. This is intended to be called each epoch.
    pub fn batch(&self, indices: Vec<usize>, batch_size: usize) -> Batch<'_> {
        Batch::new(indices, batch_size, self)
    }
}

/// Sampler produces a vector of indices in a dataset.
#[derive(Debug)]
pub enum Sampler {
    Sequential(usize),
    Random(usize, StdRng),
}

impl Sampler {
    pub fn random(size: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::Random(size, rng)
    }

    pub fn sample(&mut self) -> Vec<usize> {
        match self {
            Self::Sequential(size) => (0..*size).collect(),
            Self::Random(size, rng) => {
                let mut indices = (0..*size).collect::<Vec<_>>();
                indices.shuffle(rng);
                indices
            }
        }
    }
}

/// Batch yields a minibatch each time `Iterator::next()` is called.
pub struct Batch<'a> {
    // Kept as an iterator to track the position across minibatches.
    indices: vec::IntoIter<usize>,
    batch_size: usize,
    drop_last: bool,
    dataset: &'a Labeled,
}

impl<'a> Batch<'a> {
    pub fn new(indices: Vec<usize>, batch_size: usize, dataset: &'a Labeled) -> Self {
        Self {
            indices: indices.into_iter(),
            batch_size: batch_size.max(1),
            drop_last: false,
            dataset,
        }
    }

    /// If `drop_last` is true, discard last minibatch whose size is smaller than
    /// `self.batch_size`.
    pub fn drop_last(self, drop_last: bool) -> Self {
        Self { drop_last, ..self }
    }

    fn should_drop_last(&self, indices: &[usize]) -> bool {
        self.drop_last && indices.len() != self.batch_size
    }
}

impl<'a> Iterator for Batch<'a> {
    type Item = Labeled;

    fn next(&mut self) -> Option<Self::Item> {
        let indices = self
            .indices
            .by_ref()
            .take(self.batch_size)
            .collect::<Vec<_>>();

        if indices.is_empty() || self.should_drop_last(&indices) {
            None
        } else {
            Some(self.dataset.select(&indices))
        }
    }
}
