use std::num::NonZeroUsize;

use log::debug;
use ndarray::Axis;
use rand::{rngs::StdRng, seq::SliceRandom};

use super::{Batch, BatchSource, InMemoryDataset};

/// Splits an `InMemoryDataset` into batches of at most `batch_size` samples.
///
/// The last batch of a pass may be smaller. When created with `shuffled` the sample order is
/// reshuffled on every rewind.
#[derive(Debug, Clone)]
pub struct DataLoader {
    dataset: InMemoryDataset,
    batch_size: NonZeroUsize,
    order: Vec<usize>,
    rng: Option<StdRng>,
    cursor: usize,
}

impl DataLoader {
    pub fn new(dataset: InMemoryDataset, batch_size: NonZeroUsize) -> Self {
        let order = (0..dataset.len()).collect();

        Self {
            dataset,
            batch_size,
            order,
            rng: None,
            cursor: 0,
        }
    }

    /// Makes the loader visit the samples in a new random order on every pass.
    pub fn shuffled(mut self, mut rng: StdRng) -> Self {
        self.order.shuffle(&mut rng);
        self.rng = Some(rng);
        self.cursor = 0;
        self
    }

    #[inline]
    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    /// Returns the amount of batches in a full pass.
    #[inline]
    pub fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size.get())
    }

    #[inline]
    pub fn dataset(&self) -> &InMemoryDataset {
        &self.dataset
    }
}

impl BatchSource for DataLoader {
    fn next_batch(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size.get()).min(self.order.len());
        let rows = &self.order[self.cursor..end];
        self.cursor = end;

        let ds = &self.dataset;
        let batch = Batch {
            x: ds.x().select(Axis(0), rows),
            y: ds.y().select(Axis(0), rows),
            mask: ds.mask().map(|mask| mask.select(Axis(0), rows)),
            uuids: rows.iter().map(|&i| ds.uuids()[i].clone()).collect(),
        };

        Some(batch)
    }

    fn rewind(&mut self) {
        if let Some(rng) = self.rng.as_mut() {
            self.order.shuffle(rng);
        }

        debug!(samples = self.order.len(); "data loader rewound");
        self.cursor = 0;
    }
}
