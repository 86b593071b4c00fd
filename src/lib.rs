pub mod arch;
pub mod config;
pub mod data;
pub mod device;
pub mod error;
pub mod initialization;
pub mod optimization;
pub mod training;

pub use error::{Result, TrainErr};
