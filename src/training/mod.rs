mod builder;
mod factory;
mod hooks;
mod model_trainer;
mod options;
mod report;

pub use builder::{SpecTrainer, TrainerBuilder};
pub use factory::{ModelFactory, SequentialFactory};
pub use hooks::{EpochFinish, EpochStart, Hook, LogEpochs, NoHook, Recorder};
pub use model_trainer::{ModelTrainer, masked_mean};
pub use options::{DEFAULT_LEARNING_RATE, TrainerOptions};
pub use report::TrainReport;
