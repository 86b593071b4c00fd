use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ConstParamGen, ParamGen, RandParamGen};
use crate::Result;

/// How a layer's parameters are initialized.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Init {
    Const { value: f32 },
    Uniform { low: f32, high: f32 },
    Normal { mean: f32, std_dev: f32 },
    #[default]
    XavierUniform,
    LecunUniform,
    Kaiming,
}

impl Init {
    /// Creates the parameter generator for a single layer.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `limit` - The amount of parameters of the layer.
    /// * `fan_in`, `fan_out` - The layer's inputs and outputs.
    pub fn param_gen<'r, R: Rng + 'r>(
        self,
        rng: &'r mut R,
        limit: usize,
        fan_in: usize,
        fan_out: usize,
    ) -> Result<Box<dyn ParamGen + 'r>> {
        let param_gen: Box<dyn ParamGen + 'r> = match self {
            Init::Const { value } => Box::new(ConstParamGen::new(value, limit)),
            Init::Uniform { low, high } => Box::new(RandParamGen::uniform(rng, limit, low, high)?),
            Init::Normal { mean, std_dev } => {
                Box::new(RandParamGen::normal(rng, limit, mean, std_dev)?)
            }
            Init::XavierUniform => {
                Box::new(RandParamGen::xavier_uniform(rng, limit, fan_in, fan_out)?)
            }
            Init::LecunUniform => Box::new(RandParamGen::lecun_uniform(rng, limit, fan_in)?),
            Init::Kaiming => Box::new(RandParamGen::kaiming(rng, limit, fan_in)?),
        };

        Ok(param_gen)
    }
}
