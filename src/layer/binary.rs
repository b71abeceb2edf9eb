use std::fmt;

use ndarray::{Array2, ArrayView2, Axis, Zip};

use crate::{
    activation::ActivationFunction,
    cost::CostFunction,
    data::Labels,
    encoder::OneHotEncoder,
    error::{Error, Result},
    layer::Predictions,
};

/// Sigmoid over a single input giving the probability of the second class.
///
/// The loss is taken over the two-column distribution `[1 - p, p]`.
#[derive(Debug, Clone)]
pub struct Binary {
    encoder: OneHotEncoder,
    cost: CostFunction,
    initialized: bool,
    computed: Option<Array2<f64>>,
}

/// Expand a column of positive-class probabilities to `[1 - p, p]` rows.
fn two_column(p: ArrayView2<f64>) -> Array2<f64> {
    Array2::from_shape_fn((p.nrows(), 2), |(i, j)| {
        if j == 1 {
            p[[i, 0]]
        } else {
            1.0 - p[[i, 0]]
        }
    })
}

impl Binary {
    /// `classes` must hold exactly two labels: negative first, positive second.
    pub fn new<L: Into<String>>(
        classes: impl IntoIterator<Item = L>,
        cost: CostFunction,
    ) -> Result<Self> {
        let encoder = OneHotEncoder::new(classes)?;
        if encoder.len() != 2 {
            return Err(Error::Configuration(format!(
                "binary output needs exactly 2 classes, got {}",
                encoder.len()
            )));
        }
        Ok(Self {
            encoder,
            cost: cost.validate()?,
            initialized: false,
            computed: None,
        })
    }

    pub fn classes(&self) -> &[String] {
        self.encoder.classes()
    }

    pub fn initialize(&mut self, fan_in: usize) -> Result<()> {
        if fan_in != 1 {
            return Err(Error::Configuration(format!(
                "binary output needs 1 input, got {fan_in}"
            )));
        }
        self.initialized = true;
        self.computed = None;
        Ok(())
    }

    /// Encode labels as a column of 0 (first class) and 1 (second class).
    pub fn encode(&self, labels: &Labels) -> Result<Array2<f64>> {
        match labels {
            Labels::Categorical(labels) => {
                let mut column = Array2::zeros((labels.len(), 1));
                for (row, label) in labels.iter().enumerate() {
                    column[[row, 0]] = self.encoder.id(label)? as f64;
                }
                Ok(column)
            }
            Labels::Continuous(_) => Err(Error::LabelMismatch(
                "binary output needs categorical labels".to_string(),
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
        Ok(ActivationFunction::Sigmoid.compute(input))
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
        let distribution = two_column(computed.view());
        let target = two_column(expected);
        let loss = self.cost.compute(distribution.view(), target.view());

        let gradient = match self.cost {
            CostFunction::CrossEntropy => (&computed - &expected) / batch_size,
            cost => {
                let derivative = cost.differentiate(distribution.view(), target.view());
                let mut gradient = Array2::<f64>::zeros(computed.raw_dim());
                Zip::from(gradient.rows_mut())
                    .and(computed.rows())
                    .and(derivative.rows())
                    .for_each(|mut g, p, d| {
                        let p = p[0];
                        g[0] = (d[1] - d[0]) * p * (1.0 - p);
                    });
                gradient / batch_size
            }
        };

        Ok((loss, gradient))
    }

    pub fn decode(&self, computed: ArrayView2<f64>) -> Predictions {
        let classes = self.encoder.classes();
        Predictions::Labels(
            computed
                .column(0)
                .iter()
                .map(|&p| classes[usize::from(p >= 0.5)].clone())
                .collect(),
        )
    }
}

impl fmt::Display for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Binary (classes: {:?}, cost function: {})",
            self.encoder.classes(),
            self.cost
        )
    }
}
