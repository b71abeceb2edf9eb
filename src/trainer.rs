use tracing::{info, warn};

use crate::{
    data::{Labeled, Sampler},
    error::{Error, Result},
    network::Network,
};

/// Mini-batch training loop with early stopping.
#[derive(Debug, Clone, PartialEq)]
pub struct Trainer {
    epochs: usize,
    batch_size: usize,
    min_change: f64,
    window: usize,
    shuffle: bool,
    seed: Option<u64>,
}

impl Default for Trainer {
    fn default() -> Self {
        Self {
            epochs: 1000,
            batch_size: 128,
            min_change: 1e-4,
            window: 5,
            shuffle: true,
            seed: None,
        }
    }
}

impl Trainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epochs(self, epochs: usize) -> Result<Self> {
        if epochs == 0 {
            return Err(Error::Configuration("epochs must be at least 1".into()));
        }
        Ok(Self { epochs, ..self })
    }

    pub fn with_batch_size(self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::Configuration("batch size must be at least 1".into()));
        }
        Ok(Self { batch_size, ..self })
    }

    /// Stop once the loss improves by less than `min_change` over `window` epochs.
    pub fn with_min_change(self, min_change: f64) -> Result<Self> {
        if !(min_change.is_finite() && min_change >= 0.0) {
            return Err(Error::Configuration(format!(
                "min change must be finite and non-negative, got {min_change}"
            )));
        }
        Ok(Self { min_change, ..self })
    }

    /// Number of epochs the improvement checked by `min_change` spans.
    pub fn with_window(self, window: usize) -> Result<Self> {
        if window == 0 {
            return Err(Error::Configuration("window must be at least 1".into()));
        }
        Ok(Self { window, ..self })
    }

    /// If enabled, visit samples in a random order each epoch.
    pub fn shuffle(self, shuffle: bool) -> Self {
        Self { shuffle, ..self }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    /// Initialize `network` and train it from scratch.
    pub fn fit(&self, network: &mut Network, dataset: &Labeled) -> Result<Vec<f64>> {
        network.initialize()?;
        self.partial(network, dataset)
    }

    /// Continue training an initialized network. Returns the mean loss of each epoch.
    pub fn partial(&self, network: &mut Network, dataset: &Labeled) -> Result<Vec<f64>> {
        network.check(dataset)?;

        let mut sampler = if self.shuffle {
            Sampler::random(dataset.num_samples(), self.seed)
        } else {
            Sampler::Sequential(dataset.num_samples())
        };

        info!(
            samples = dataset.num_samples(),
            epochs = self.epochs,
            batch_size = self.batch_size,
            "training started"
        );

        let mut losses = Vec::with_capacity(self.epochs);
        for epoch in 1..=self.epochs {
            let mut total_loss = 0.0;
            let mut n_batches = 0;
            for batch in dataset.batch(sampler.sample(), self.batch_size) {
                total_loss += network.roundtrip(&batch)?;
                n_batches += 1;
            }
            let loss = total_loss / n_batches as f64;

            if !loss.is_finite() {
                warn!(epoch, loss, "numerical instability detected, stopping");
                break;
            }
            info!(epoch, loss, "epoch complete");

            losses.push(loss);
            if self.converged(&losses) {
                info!(epoch, loss, window = self.window, "loss converged, stopping");
                break;
            }
        }

        Ok(losses)
    }

    /// Whether the loss improved by less than `min_change` over the last
    /// `window` epochs. Needs `window + 1` losses to decide.
    fn converged(&self, losses: &[f64]) -> bool {
        match losses.len().checked_sub(self.window + 1) {
            Some(start) => losses[start] - losses[losses.len() - 1] < self.min_change,
            None => false,
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
        layer::{Activation, Continuous, Dense, Input},
        optimizer::Adam,
    };
    use ndarray::Array2;

    fn regressor() -> Network {
        Network::new(
            Input::new(1).unwrap(),
            vec![
                Dense::new(8).unwrap().into(),
                Activation::new(ActivationFunction::HyperbolicTangent)
                    .unwrap()
                    .into(),
                Dense::new(1).unwrap().into(),
            ],
            Continuous::new(CostFunction::LeastSquares).unwrap(),
            Box::new(Adam::new(0.01).unwrap()),
        )
        .with_seed(11)
    }

    fn line(n: usize) -> Labeled {
        let xs = (0..n).map(|i| i as f64 / n as f64).collect::<Vec<_>>();
        let ys = xs.iter().map(|x| 2.0 * x - 0.5).collect();
        Labeled::new(
            Array2::from_shape_vec((n, 1), xs).unwrap(),
            Labels::Continuous(ys),
        )
        .unwrap()
    }

    #[test]
    fn fit_reduces_loss() {
        let trainer = Trainer::new()
            .with_epochs(200)
            .unwrap()
            .with_batch_size(8)
            .unwrap()
            .with_min_change(0.0)
            .unwrap()
            .with_window(200)
            .unwrap()
            .with_seed(1);
        let mut network = regressor();
        let losses = trainer.fit(&mut network, &line(32)).unwrap();

        assert_eq!(losses.len(), 200);
        assert!(losses.last().unwrap() < &(losses[0] / 5.0));
    }

    #[test]
    fn stops_early_once_converged() {
        let trainer = Trainer::new()
            .with_epochs(1000)
            .unwrap()
            .with_window(3)
            .unwrap()
            .with_min_change(1e-4)
            .unwrap()
            .shuffle(false);
        let mut network = regressor();
        let data = Labeled::new(Array2::zeros((1, 1)), Labels::Continuous(vec![1.0])).unwrap();
        let losses = trainer.fit(&mut network, &data).unwrap();
        assert!(losses.len() > 3);
        assert!(losses.len() < 1000);
    }

    fn steady_decline(epochs: usize) -> Vec<f64> {
        (0..epochs).map(|i| 1.0 - 0.005 * i as f64).collect()
    }

    #[test]
    fn slow_steady_progress_keeps_training() {
        let trainer = Trainer::new()
            .with_min_change(0.01)
            .unwrap()
            .with_window(5)
            .unwrap();
        let losses = steady_decline(20);
        assert!((1..=losses.len()).all(|n| !trainer.converged(&losses[..n])));
    }

    #[test]
    fn narrow_window_sees_small_steps() {
        let trainer = Trainer::new()
            .with_min_change(0.01)
            .unwrap()
            .with_window(1)
            .unwrap();
        let losses = steady_decline(20);
        assert!(!trainer.converged(&losses[..1]));
        assert!(trainer.converged(&losses[..2]));
    }

    #[test]
    fn plateau_is_detected_after_window() {
        let trainer = Trainer::new()
            .with_min_change(1e-3)
            .unwrap()
            .with_window(5)
            .unwrap();
        let losses = [1.0, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5];
        assert!(!trainer.converged(&losses[..5]));
        assert!(!trainer.converged(&losses[..6]));
        assert!(trainer.converged(&losses));
    }

    #[test]
    fn rising_loss_converges_without_min_change() {
        let trainer = Trainer::new()
            .with_min_change(0.0)
            .unwrap()
            .with_window(2)
            .unwrap();
        assert!(!trainer.converged(&[1.0, 0.9, 0.8]));
        assert!(trainer.converged(&[1.0, 0.9, 1.1]));
    }

    #[test]
    fn partial_requires_initialize() {
        let mut network = regressor();
        assert_eq!(
            Trainer::new().partial(&mut network, &line(4)),
            Err(Error::NotInitialized)
        );
    }

    #[test]
    fn rejects_zero_batch_size() {
        assert!(Trainer::new().with_batch_size(0).is_err());
    }
}
