use ndarray::{Array2, ArrayView2, ArrayViewD};
use ndarray_rand::rand::{rngs::StdRng, SeedableRng};
use tracing::debug;

use crate::{
    data::Labeled,
    error::{Error, Result},
    layer::{Hidden, Input, LayerRef, Output, Predictions},
    optimizer::Optimizer,
    param::{ParamId, ParamIds},
};

/// A chain of layers `[Input, Hidden..., Output]` trained by one optimizer.
///
/// Batches are matrices with one sample per row. Layers hold no parameters until
/// [`Network::initialize`] runs, and every other operation except introspection
/// fails with [`Error::NotInitialized`] before that.
#[derive(Debug)]
pub struct Network {
    input: Input,
    hidden: Vec<Hidden>,
    output: Output,
    optimizer: Box<dyn Optimizer>,
    seed: Option<u64>,
    initialized: bool,
}

impl Network {
    pub fn new(
        input: Input,
        hidden: Vec<Hidden>,
        output: impl Into<Output>,
        optimizer: Box<dyn Optimizer>,
    ) -> Self {
        Self {
            input,
            hidden,
            output: output.into(),
            optimizer,
            seed: None,
            initialized: false,
        }
    }

    /// Draw initial parameters from a fixed seed so that every `initialize`
    /// produces the same values.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn hidden(&self) -> &[Hidden] {
        &self.hidden
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Every layer in chain order.
    pub fn layers(&self) -> Vec<LayerRef<'_>> {
        std::iter::once(LayerRef::Input(&self.input))
            .chain(self.hidden.iter().map(LayerRef::Hidden))
            .chain(std::iter::once(LayerRef::Output(&self.output)))
            .collect()
    }

    /// Allocate fresh parameters in every layer and reset the optimizer.
    ///
    /// Calling this again discards all learned parameters and optimizer state.
    /// On error the network keeps its previous state.
    pub fn initialize(&mut self) -> Result<()> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut ids = ParamIds::new();

        let mut hidden = self.hidden.clone();
        let mut output = self.output.clone();
        let mut fan_in = self.input.width();
        for layer in hidden.iter_mut() {
            fan_in = layer.initialize(fan_in, &mut ids, &mut rng)?;
        }
        output.initialize(fan_in)?;

        self.hidden = hidden;
        self.output = output;
        self.optimizer.reset();
        for layer in &self.hidden {
            for (id, param) in layer.parameters() {
                self.optimizer.warm(id, param.shape());
            }
        }
        self.initialized = true;

        for layer in self.layers() {
            debug!(layer = %layer, "initialized layer");
        }
        let params = self.num_params()?;
        debug!(params, optimizer = %self.optimizer, "initialized network");
        Ok(())
    }

    /// Total number of elements over all parameter tensors.
    pub fn num_params(&self) -> Result<usize> {
        self.ensure_initialized()?;
        Ok(self.hidden.iter().map(Hidden::num_params).sum())
    }

    /// Every parameter tensor with its id, in chain order.
    pub fn parameters(&self) -> Result<Vec<(ParamId, ArrayViewD<'_, f64>)>> {
        self.ensure_initialized()?;
        Ok(self.hidden.iter().flat_map(Hidden::parameters).collect())
    }

    /// Validate a labeled batch against the network without touching any tensor.
    pub fn check(&self, batch: &Labeled) -> Result<()> {
        self.ensure_initialized()?;
        self.input.check(batch.samples())?;
        self.output.encode(batch.labels()).map(|_| ())
    }

    /// One training step: forward pass, loss, backward pass and parameter update.
    ///
    /// Returns the batch-mean loss. Validation errors are raised before any
    /// parameter changes.
    pub fn roundtrip(&mut self, batch: &Labeled) -> Result<f64> {
        self.ensure_initialized()?;
        self.input.check(batch.samples())?;
        let expected = self.output.encode(batch.labels())?;

        let mut activations = batch.samples().to_owned();
        for layer in self.hidden.iter_mut() {
            activations = layer.forward(activations)?;
        }
        self.output.forward(activations)?;

        let (loss, mut gradient) = self.output.back(expected.view())?;
        for layer in self.hidden.iter_mut().rev() {
            gradient = layer.back(gradient, self.optimizer.as_mut())?;
        }
        // The input layer has nothing to learn; the remaining gradient ends here.

        Ok(loss)
    }

    /// Forward pass without loss or mutation.
    pub fn infer(&self, samples: ArrayView2<f64>) -> Result<Array2<f64>> {
        self.ensure_initialized()?;
        self.input.check(samples)?;

        let mut activations = samples.to_owned();
        for layer in &self.hidden {
            activations = layer.infer(activations.view())?;
        }
        self.output.infer(activations.view())
    }

    /// Decode the output of [`Network::infer`] into labels or values.
    pub fn predict(&self, samples: ArrayView2<f64>) -> Result<Predictions> {
        let computed = self.infer(samples)?;
        Ok(self.output.decode(computed.view()))
    }

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        activation::ActivationFunction,
        cost::CostFunction,
        data::Labels,
        layer::{Activation, Continuous, Dense, Multiclass},
        optimizer::{Adam, Stochastic},
    };
    use ndarray::arr2;

    fn classifier() -> Network {
        Network::new(
            Input::new(2).unwrap(),
            vec![
                Dense::new(4).unwrap().into(),
                Activation::new(ActivationFunction::Relu).unwrap().into(),
                Dense::new(2).unwrap().into(),
            ],
            Multiclass::new(["red", "blue"], CostFunction::CrossEntropy).unwrap(),
            Box::new(Adam::new(0.01).unwrap()),
        )
        .with_seed(5)
    }

    #[test]
    fn layers_in_chain_order() {
        let network = classifier();
        let layers = network.layers();
        assert_eq!(layers.len(), 5);
        assert!(matches!(layers[0], LayerRef::Input(_)));
        assert!(matches!(layers[2], LayerRef::Hidden(Hidden::Activation(_))));
        assert!(matches!(layers[4], LayerRef::Output(Output::Multiclass(_))));
        assert_eq!(layers[1].to_string(), "Dense (neurons: 4, l2 penalty: 0, bias: true)");
    }

    #[test]
    fn failed_initialize_keeps_state() {
        let mut network = Network::new(
            Input::new(2).unwrap(),
            vec![Dense::new(3).unwrap().into()],
            Continuous::new(CostFunction::LeastSquares).unwrap(),
            Box::new(Stochastic::new(0.1).unwrap()),
        );
        assert!(matches!(
            network.initialize(),
            Err(Error::Configuration(_))
        ));
        assert!(!network.is_initialized());
        assert!(matches!(network.hidden()[0], Hidden::Dense(ref d) if d.weights().is_none()));
    }

    #[test]
    fn check_reports_label_mismatch() {
        let mut network = classifier();
        network.initialize().unwrap();
        let batch = Labeled::new(arr2(&[[0.0, 1.0]]), Labels::categorical(["green"])).unwrap();
        assert!(matches!(
            network.check(&batch),
            Err(Error::LabelMismatch(_))
        ));
    }

    #[test]
    fn unknown_label_leaves_parameters_unchanged() {
        let mut network = classifier();
        network.initialize().unwrap();
        let before = network
            .parameters()
            .unwrap()
            .into_iter()
            .map(|(_, p)| p.to_owned())
            .collect::<Vec<_>>();

        let batch = Labeled::new(
            arr2(&[[0.0, 1.0], [1.0, 0.0]]),
            Labels::categorical(["red", "green"]),
        )
        .unwrap();
        assert!(matches!(
            network.roundtrip(&batch),
            Err(Error::LabelMismatch(_))
        ));

        let after = network
            .parameters()
            .unwrap()
            .into_iter()
            .map(|(_, p)| p.to_owned())
            .collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn parameter_ids_are_unique() {
        let mut network = classifier();
        network.initialize().unwrap();
        let mut ids = network
            .parameters()
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }
}
