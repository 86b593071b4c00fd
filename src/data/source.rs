use super::Batch;

/// A restartable, single-consumer sequence of batches.
pub trait BatchSource {
    /// Returns the next batch, or `None` if the source is exhausted.
    fn next_batch(&mut self) -> Option<Batch>;

    /// Restarts the iteration from the first batch.
    fn rewind(&mut self);
}

impl<S: BatchSource + ?Sized> BatchSource for Box<S> {
    fn next_batch(&mut self) -> Option<Batch> {
        (**self).next_batch()
    }

    fn rewind(&mut self) {
        (**self).rewind()
    }
}

/// A batch source over already built batches.
#[derive(Debug, Clone, Default)]
pub struct BatchList {
    batches: Vec<Batch>,
    cursor: usize,
}

impl BatchList {
    pub fn new(batches: Vec<Batch>) -> Self {
        Self { batches, cursor: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

impl BatchSource for BatchList {
    fn next_batch(&mut self) -> Option<Batch> {
        let batch = self.batches.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(batch)
    }

    fn rewind(&mut self) {
        self.cursor = 0;
    }
}
