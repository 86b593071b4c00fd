use std::{fs, num::NonZeroUsize, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    Result, TrainErr,
    data::{HeaderInfo, Playlist},
    initialization::Init,
    optimization::{DEFAULT_BETA1, DEFAULT_BETA2, DEFAULT_EPSILON},
    training::DEFAULT_LEARNING_RATE,
};

/// The specification for the `ActFn` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Sigmoid { amp: f32 },
    Relu,
}

/// The specification for the `Layer` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Dense {
        dim: (usize, usize),
        act_fn: Option<ActFnSpec>,
    },
}

/// The specification for the model.
///
/// `FromDataset` leaves the input and output layers to the dataset's header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSpec {
    Sequential {
        layers: Vec<LayerSpec>,
        #[serde(default)]
        init: Init,
    },
    FromDataset {
        hidden: Vec<usize>,
        act_fn: Option<ActFnSpec>,
        #[serde(default)]
        init: Init,
    },
}

/// The specification for the `Optimizer` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    Adam {
        learning_rate: f32,
        #[serde(default = "default_beta1")]
        beta1: f32,
        #[serde(default = "default_beta2")]
        beta2: f32,
        #[serde(default = "default_epsilon")]
        epsilon: f32,
    },
    GradientDescent {
        learning_rate: f32,
    },
    GradientDescentWithMomentum {
        learning_rate: f32,
        momentum: f32,
    },
}

impl Default for OptimizerSpec {
    fn default() -> Self {
        Self::Adam {
            learning_rate: DEFAULT_LEARNING_RATE,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl OptimizerSpec {
    pub fn learning_rate(&self) -> f32 {
        match *self {
            Self::Adam { learning_rate, .. }
            | Self::GradientDescent { learning_rate }
            | Self::GradientDescentWithMomentum { learning_rate, .. } => learning_rate,
        }
    }
}

/// The specification for the `LossFn` trait.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossFnSpec {
    #[default]
    Mse,
    Mae,
}

/// The specification for an in-memory dataset, rows laid out as the header describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub header: HeaderInfo,
    pub playlist: Playlist,
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub mask: Option<Vec<f32>>,
    pub uuids: Option<Vec<String>>,
}

/// The specification for a whole training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerSpec {
    pub model: ModelSpec,
    #[serde(default)]
    pub optimizer: OptimizerSpec,
    #[serde(default)]
    pub loss: LossFnSpec,
    pub dataset: DatasetSpec,
    pub epochs: NonZeroUsize,
    pub batch_size: NonZeroUsize,
    #[serde(default = "default_accumulation_steps")]
    pub accumulation_steps: NonZeroUsize,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default = "default_device")]
    pub device: String,
    pub seed: Option<u64>,
}

impl TrainerSpec {
    /// Parses and validates a spec written in JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: Self = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Reads, parses and validates a JSON spec file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks the invariants serde can't: layer chaining, the model matching the dataset's
    /// layout and sane hyperparameters.
    pub fn validate(&self) -> Result<()> {
        let header = &self.dataset.header;

        match &self.model {
            ModelSpec::Sequential { layers, .. } => {
                validate_layers(layers, header.input_size(), header.output_size())?
            }
            ModelSpec::FromDataset { hidden, .. } => {
                if hidden.contains(&0) {
                    return Err(TrainErr::InvalidConfig(
                        "hidden layers must have at least one unit".into(),
                    ));
                }
            }
        }

        let lr = self.optimizer.learning_rate();
        if !lr.is_finite() || lr <= 0. {
            return Err(TrainErr::InvalidConfig(format!(
                "learning rate must be a positive number, got {lr}"
            )));
        }

        Ok(())
    }
}

fn validate_layers(layers: &[LayerSpec], input: usize, output: usize) -> Result<()> {
    let dims: Vec<(usize, usize)> = layers
        .iter()
        .map(|layer| match *layer {
            LayerSpec::Dense { dim, .. } => dim,
        })
        .collect();

    let (Some(first), Some(last)) = (dims.first(), dims.last()) else {
        return Err(TrainErr::InvalidConfig(
            "model must have at least one layer".into(),
        ));
    };

    if first.0 != input {
        return Err(TrainErr::InvalidConfig(format!(
            "the first layer takes {} inputs but the dataset has {input} features",
            first.0
        )));
    }

    if last.1 != output {
        return Err(TrainErr::InvalidConfig(format!(
            "the last layer has {} outputs but the dataset has {output} targets",
            last.1
        )));
    }

    // Adjacent layers must have compatible dimensions: prev.1 == next.0
    for (i, pair) in dims.windows(2).enumerate() {
        let (prev, curr) = (pair[0], pair[1]);
        if prev.1 != curr.0 {
            return Err(TrainErr::InvalidConfig(format!(
                "layer {}: input size ({}) does not match previous layer output size ({})",
                i + 1,
                curr.0,
                prev.1
            )));
        }
    }

    Ok(())
}

fn default_beta1() -> f32 {
    DEFAULT_BETA1
}

fn default_beta2() -> f32 {
    DEFAULT_BETA2
}

fn default_epsilon() -> f32 {
    DEFAULT_EPSILON
}

fn default_accumulation_steps() -> NonZeroUsize {
    NonZeroUsize::MIN
}

fn default_device() -> String {
    "cpu".into()
}
