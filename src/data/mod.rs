mod batch;
mod dataloader;
mod dataset;
mod source;

pub use batch::Batch;
pub use dataloader::DataLoader;
pub use dataset::{HeaderInfo, InMemoryDataset, Playlist, ReplayDataset};
pub use source::{BatchList, BatchSource};
