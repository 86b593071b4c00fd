use std::{fmt, num::NonZeroUsize};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{BatchSource, DataLoader};
use crate::{Result, TrainErr};

/// Describes the feature layout of a dataset: one name per input column and per target
/// column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub features: Vec<String>,
    pub targets: Vec<String>,
}

impl HeaderInfo {
    pub fn new(features: Vec<String>, targets: Vec<String>) -> Self {
        Self { features, targets }
    }

    /// The width of an input row.
    pub fn input_size(&self) -> usize {
        self.features.len()
    }

    /// The width of a target row.
    pub fn output_size(&self) -> usize {
        self.targets.len()
    }
}

/// Identifies the playlist the samples of a dataset were recorded in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Playlist(String);

impl Playlist {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Playlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dataset that knows its own layout and can be wrapped into a batched source.
pub trait ReplayDataset {
    type Source: BatchSource;

    fn header_info(&self) -> &HeaderInfo;

    fn playlist(&self) -> &Playlist;

    /// Consumes the dataset, yielding batches of at most `batch_size` samples.
    fn batched(self, batch_size: NonZeroUsize) -> Self::Source;
}

/// A dataset held entirely in memory, one row per sample.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    header: HeaderInfo,
    playlist: Playlist,
    x: Array2<f32>,
    y: Array2<f32>,
    mask: Option<Array2<f32>>,
    uuids: Vec<String>,
}

impl InMemoryDataset {
    /// Creates a new dataset from row-major buffers.
    ///
    /// # Arguments
    /// * `header` - The layout of the rows, it decides the width of `xs` and `ys` rows.
    /// * `playlist` - The playlist the samples belong to.
    /// * `xs` - The inputs, `header.input_size()` values per sample.
    /// * `ys` - The targets, `header.output_size()` values per sample.
    ///
    /// # Errors
    /// `InvalidConfig` if the layout is empty or the buffers don't hold the same amount of
    /// whole samples.
    pub fn new(header: HeaderInfo, playlist: Playlist, xs: Vec<f32>, ys: Vec<f32>) -> Result<Self> {
        let (x_size, y_size) = (header.input_size(), header.output_size());

        if x_size == 0 || y_size == 0 {
            return Err(TrainErr::InvalidConfig(
                "the header must name at least one feature and one target".into(),
            ));
        }

        if xs.len() % x_size != 0 || ys.len() % y_size != 0 {
            return Err(TrainErr::InvalidConfig(format!(
                "buffers of {} inputs and {} targets don't hold whole rows of {x_size} and {y_size}",
                xs.len(),
                ys.len()
            )));
        }

        let rows = xs.len() / x_size;
        if ys.len() / y_size != rows {
            return Err(TrainErr::SizeMismatch {
                what: "dataset targets",
                got: ys.len() / y_size,
                expected: rows,
            });
        }

        let x = Array2::from_shape_vec((rows, x_size), xs)?;
        let y = Array2::from_shape_vec((rows, y_size), ys)?;
        let uuids = (0..rows).map(|i| i.to_string()).collect();

        Ok(Self {
            header,
            playlist,
            x,
            y,
            mask: None,
            uuids,
        })
    }

    /// Sets the validity mask, `header.output_size()` values per sample.
    pub fn with_mask(mut self, mask: Vec<f32>) -> Result<Self> {
        if mask.len() != self.y.len() {
            return Err(TrainErr::SizeMismatch {
                what: "dataset mask",
                got: mask.len(),
                expected: self.y.len(),
            });
        }

        self.mask = Some(Array2::from_shape_vec(self.y.dim(), mask)?);
        Ok(self)
    }

    /// Sets the per-sample identifiers.
    pub fn with_uuids(mut self, uuids: Vec<String>) -> Result<Self> {
        if uuids.len() != self.len() {
            return Err(TrainErr::SizeMismatch {
                what: "dataset uuids",
                got: uuids.len(),
                expected: self.len(),
            });
        }

        self.uuids = uuids;
        Ok(self)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    #[inline]
    pub fn x(&self) -> &Array2<f32> {
        &self.x
    }

    #[inline]
    pub fn y(&self) -> &Array2<f32> {
        &self.y
    }

    #[inline]
    pub fn mask(&self) -> Option<&Array2<f32>> {
        self.mask.as_ref()
    }

    #[inline]
    pub fn uuids(&self) -> &[String] {
        &self.uuids
    }
}

impl ReplayDataset for InMemoryDataset {
    type Source = DataLoader;

    fn header_info(&self) -> &HeaderInfo {
        &self.header
    }

    fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    fn batched(self, batch_size: NonZeroUsize) -> DataLoader {
        DataLoader::new(self, batch_size)
    }
}
