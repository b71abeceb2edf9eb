use std::fmt;

use ndarray::{Array2, ArrayView2, Axis, Zip};

use crate::{
    cost::CostFunction,
    data::Labels,
    encoder::OneHotEncoder,
    error::{Error, Result},
    layer::Predictions,
};

/// Softmax over one input per class, trained against one-hot labels.
#[derive(Debug, Clone)]
pub struct Multiclass {
    encoder: OneHotEncoder,
    cost: CostFunction,
    initialized: bool,
    computed: Option<Array2<f64>>,
}

fn softmax(x: ArrayView2<f64>) -> Array2<f64> {
    let mut output = x.to_owned();
    for mut row in output.rows_mut() {
        let max_element = row.fold(f64::NEG_INFINITY, |v, &w| v.max(w));
        row.mapv_inplace(|v| (v - max_element).exp());
        let exp_sum = row.sum();
        row /= exp_sum;
    }
    output
}

impl Multiclass {
    pub fn new<L: Into<String>>(
        classes: impl IntoIterator<Item = L>,
        cost: CostFunction,
    ) -> Result<Self> {
        let encoder = OneHotEncoder::new(classes)?;
        if encoder.len() < 2 {
            return Err(Error::Configuration(format!(
                "multiclass output needs at least 2 classes, got {}",
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

    fn fan_in(&self) -> usize {
        self.encoder.len()
    }

    pub fn initialize(&mut self, fan_in: usize) -> Result<()> {
        if fan_in != self.fan_in() {
            return Err(Error::Configuration(format!(
                "multiclass output with {} classes needs {} inputs, got {fan_in}",
                self.fan_in(),
                self.fan_in()
            )));
        }
        self.initialized = true;
        self.computed = None;
        Ok(())
    }

    pub fn encode(&self, labels: &Labels) -> Result<Array2<f64>> {
        match labels {
            Labels::Categorical(labels) => self.encoder.encode(labels),
            Labels::Continuous(_) => Err(Error::LabelMismatch(
                "multiclass output needs categorical labels".to_string(),
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
        Ok(softmax(input))
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

        let gradient = match self.cost {
            CostFunction::CrossEntropy => (&computed - &expected) / batch_size,
            cost => {
                // Chain through the softmax Jacobian one row at a time.
                let derivative = cost.differentiate(computed.view(), expected);
                let mut gradient = Array2::<f64>::zeros(computed.raw_dim());
                Zip::from(gradient.rows_mut())
                    .and(computed.rows())
                    .and(derivative.rows())
                    .for_each(|mut g, s, d| {
                        let dot = s.dot(&d);
                        g.assign(&(&s * &(&d - dot)));
                    });
                gradient / batch_size
            }
        };

        Ok((loss, gradient))
    }

    pub fn decode(&self, computed: ArrayView2<f64>) -> Predictions {
        Predictions::Labels(self.encoder.decode(computed))
    }
}

impl fmt::Display for Multiclass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Multiclass (classes: {:?}, cost function: {})",
            self.encoder.classes(),
            self.cost
        )
    }
}
