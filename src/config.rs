use serde::Deserialize;

use crate::{
    activation::ActivationFunction,
    cost::CostFunction,
    error::{Error, Result},
    init::Initializer,
    layer::{Activation, Binary, Continuous, Dense, Dropout, Hidden, Input, Multiclass, Output},
    network::Network,
    optimizer::{Adam, Momentum, Optimizer, Stochastic},
};

/// Declarative description of a network. Each enum is tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    pub input: usize,
    #[serde(default)]
    pub hidden: Vec<HiddenConfig>,
    pub output: OutputConfig,
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HiddenConfig {
    Dense {
        neurons: usize,
        #[serde(default)]
        l2_penalty: f64,
        #[serde(default = "default_bias")]
        bias: bool,
        #[serde(default)]
        weight_initializer: Initializer,
        #[serde(default = "default_bias_initializer")]
        bias_initializer: Initializer,
    },
    Activation {
        function: ActivationFunction,
    },
    Dropout {
        ratio: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputConfig {
    Multiclass {
        classes: Vec<String>,
        #[serde(default = "default_classifier_cost")]
        cost: CostFunction,
    },
    Binary {
        classes: Vec<String>,
        #[serde(default = "default_classifier_cost")]
        cost: CostFunction,
    },
    Continuous {
        #[serde(default = "default_regressor_cost")]
        cost: CostFunction,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Stochastic {
        rate: f64,
    },
    Momentum {
        rate: f64,
        #[serde(default = "default_momentum_decay")]
        decay: f64,
    },
    Adam {
        rate: f64,
        #[serde(default = "default_beta1")]
        beta1: f64,
        #[serde(default = "default_beta2")]
        beta2: f64,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
}

fn default_bias() -> bool {
    true
}

fn default_bias_initializer() -> Initializer {
    Initializer::Constant { value: 0.0 }
}

fn default_classifier_cost() -> CostFunction {
    CostFunction::CrossEntropy
}

fn default_regressor_cost() -> CostFunction {
    CostFunction::LeastSquares
}

fn default_momentum_decay() -> f64 {
    0.9
}

fn default_beta1() -> f64 {
    0.9
}

fn default_beta2() -> f64 {
    0.999
}

fn default_epsilon() -> f64 {
    1e-8
}

impl NetworkConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Construct the (uninitialized) network described by this config.
    pub fn build(&self) -> Result<Network> {
        let hidden = self
            .hidden
            .iter()
            .map(HiddenConfig::build)
            .collect::<Result<Vec<_>>>()?;
        let network = Network::new(
            Input::new(self.input)?,
            hidden,
            self.output.build()?,
            self.optimizer.build()?,
        );
        Ok(match self.seed {
            Some(seed) => network.with_seed(seed),
            None => network,
        })
    }
}

impl HiddenConfig {
    pub fn build(&self) -> Result<Hidden> {
        Ok(match *self {
            Self::Dense {
                neurons,
                l2_penalty,
                bias,
                weight_initializer,
                bias_initializer,
            } => Dense::new(neurons)?
                .with_l2_penalty(l2_penalty)?
                .with_bias(bias)
                .with_initializers(weight_initializer, bias_initializer)?
                .into(),
            Self::Activation { function } => Activation::new(function)?.into(),
            Self::Dropout { ratio } => Dropout::new(ratio)?.into(),
        })
    }
}

impl OutputConfig {
    pub fn build(&self) -> Result<Output> {
        Ok(match self {
            Self::Multiclass { classes, cost } => Multiclass::new(classes.clone(), *cost)?.into(),
            Self::Binary { classes, cost } => Binary::new(classes.clone(), *cost)?.into(),
            Self::Continuous { cost } => Continuous::new(*cost)?.into(),
        })
    }
}

impl OptimizerConfig {
    pub fn build(&self) -> Result<Box<dyn Optimizer>> {
        let optimizer: Box<dyn Optimizer> = match *self {
            Self::Stochastic { rate } => Box::new(Stochastic::new(rate)?),
            Self::Momentum { rate, decay } => Box::new(Momentum::new(rate)?.with_decay(decay)?),
            Self::Adam {
                rate,
                beta1,
                beta2,
                epsilon,
            } => Box::new(
                Adam::new(rate)?
                    .with_betas(beta1, beta2)?
                    .with_epsilon(epsilon)?,
            ),
        };
        Ok(optimizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASSIFIER: &str = r#"{
        "input": 2,
        "hidden": [
            {"type": "dense", "neurons": 10, "weight_initializer": {"type": "he"}},
            {"type": "activation", "function": {"type": "leaky_relu", "leakage": 0.1}},
            {"type": "dropout", "ratio": 0.2},
            {"type": "dense", "neurons": 3}
        ],
        "output": {"type": "multiclass", "classes": ["a", "b", "c"]},
        "optimizer": {"type": "adam", "rate": 0.001},
        "seed": 3
    }"#;

    #[test]
    fn parse_classifier() {
        let config = NetworkConfig::from_json(CLASSIFIER).unwrap();
        assert_eq!(config.input, 2);
        assert_eq!(config.hidden.len(), 4);
        assert_eq!(
            config.hidden[0],
            HiddenConfig::Dense {
                neurons: 10,
                l2_penalty: 0.0,
                bias: true,
                weight_initializer: Initializer::He,
                bias_initializer: Initializer::Constant { value: 0.0 },
            }
        );
        assert_eq!(
            config.output,
            OutputConfig::Multiclass {
                classes: vec!["a".into(), "b".into(), "c".into()],
                cost: CostFunction::CrossEntropy,
            }
        );
        assert_eq!(config.seed, Some(3));
    }

    #[test]
    fn build_and_initialize() {
        let mut network = NetworkConfig::from_json(CLASSIFIER).unwrap().build().unwrap();
        network.initialize().unwrap();
        assert_eq!(network.num_params().unwrap(), 2 * 10 + 10 + 10 * 3 + 3);
        assert_eq!(network.layers().len(), 6);
    }

    #[test]
    fn unknown_tag_is_a_configuration_error() {
        let json = r#"{
            "input": 1,
            "output": {"type": "continuous"},
            "optimizer": {"type": "rmsprop", "rate": 0.1}
        }"#;
        assert!(matches!(
            NetworkConfig::from_json(json),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn invalid_hyperparameter_fails_build() {
        let json = r#"{
            "input": 1,
            "hidden": [{"type": "activation", "function": {"type": "leaky_relu", "leakage": 2.0}}],
            "output": {"type": "continuous"},
            "optimizer": {"type": "stochastic", "rate": 0.1}
        }"#;
        let config = NetworkConfig::from_json(json).unwrap();
        assert!(matches!(config.build(), Err(Error::Configuration(_))));
    }
}
