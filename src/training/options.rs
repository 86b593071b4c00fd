use std::num::NonZeroUsize;

use super::{Hook, LogEpochs};
use crate::arch::loss::{LossFn, Mse};

pub const DEFAULT_LEARNING_RATE: f32 = 0.00001;

/// The optional parts of a `ModelTrainer`.
///
/// Defaults to `Mse` loss, `LogEpochs` hook, a single accumulation step and a learning rate
/// of `0.00001`.
#[derive(Debug, Clone)]
pub struct TrainerOptions<L = Mse, H = LogEpochs> {
    pub loss_fn: L,
    pub hook: H,
    pub accumulation_steps: NonZeroUsize,
    pub learning_rate: f32,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            loss_fn: Mse,
            hook: LogEpochs,
            accumulation_steps: NonZeroUsize::MIN,
            learning_rate: DEFAULT_LEARNING_RATE,
        }
    }
}

impl<L: LossFn, H: Hook> TrainerOptions<L, H> {
    pub fn loss_fn<L2: LossFn>(self, loss_fn: L2) -> TrainerOptions<L2, H> {
        TrainerOptions {
            loss_fn,
            hook: self.hook,
            accumulation_steps: self.accumulation_steps,
            learning_rate: self.learning_rate,
        }
    }

    pub fn hook<H2: Hook>(self, hook: H2) -> TrainerOptions<L, H2> {
        TrainerOptions {
            loss_fn: self.loss_fn,
            hook,
            accumulation_steps: self.accumulation_steps,
            learning_rate: self.learning_rate,
        }
    }

    pub fn accumulation_steps(mut self, steps: NonZeroUsize) -> Self {
        self.accumulation_steps = steps;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }
}
