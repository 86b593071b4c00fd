use ndarray::Array2;

use crate::{Result, TrainErr};

/// One unit of training data: a row per sample.
///
/// `mask` marks which target positions are valid (1) or padding (0). A batch without a mask
/// treats every position as valid.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub x: Array2<f32>,
    pub y: Array2<f32>,
    pub mask: Option<Array2<f32>>,
    pub uuids: Vec<String>,
}

impl Batch {
    /// Creates a new unmasked `Batch`, naming each sample after its row.
    ///
    /// # Errors
    /// `SizeMismatch` if `x` and `y` have a different amount of rows.
    pub fn new(x: Array2<f32>, y: Array2<f32>) -> Result<Self> {
        if x.nrows() != y.nrows() {
            return Err(TrainErr::SizeMismatch {
                what: "batch targets",
                got: y.nrows(),
                expected: x.nrows(),
            });
        }

        let uuids = (0..x.nrows()).map(|i| i.to_string()).collect();
        Ok(Self {
            x,
            y,
            mask: None,
            uuids,
        })
    }

    /// Sets the validity mask of this batch.
    ///
    /// # Errors
    /// `SizeMismatch` if the mask isn't shaped like the targets.
    pub fn with_mask(mut self, mask: Array2<f32>) -> Result<Self> {
        if mask.dim() != self.y.dim() {
            return Err(TrainErr::SizeMismatch {
                what: "batch mask",
                got: mask.len(),
                expected: self.y.len(),
            });
        }

        self.mask = Some(mask);
        Ok(self)
    }

    /// Sets the per-sample identifiers of this batch.
    ///
    /// # Errors
    /// `SizeMismatch` if there isn't exactly one identifier per sample.
    pub fn with_uuids(mut self, uuids: Vec<String>) -> Result<Self> {
        if uuids.len() != self.len() {
            return Err(TrainErr::SizeMismatch {
                what: "batch uuids",
                got: uuids.len(),
                expected: self.len(),
            });
        }

        self.uuids = uuids;
        Ok(self)
    }

    /// Returns the amount of samples in the batch.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }
}
