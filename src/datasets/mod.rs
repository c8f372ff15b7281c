//! This module only defines the dataset logic for loading, caching and batching
//! sprites world samples. Rendering the sprites is left to a [`SampleGenerator`],
//! this crate only calls it.
use std::fmt;

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

pub mod cache;
pub mod data;
pub mod generator;
pub mod loader;
pub mod transforms;

pub use cache::{dump_generated_dataset, obtain, PreGeneratedDataset};
pub use data::{Batch, TensorDataset};
pub use generator::{GenerationRequest, SampleGenerator, SampleMode};
pub use loader::DataLoader;

/// Channels of a rendered sprites world image
pub const IMAGE_CHANNELS: usize = 3;
/// Side length of a rendered sprites world image
pub const IMAGE_SIZE: usize = 64;

/// The universal Dataset trait, which is the final object
/// passed to the model for training
pub trait Dataset {
    type DataPoint;
    fn next(&mut self) -> Option<Self::DataPoint>;
    fn reset(&mut self);
    fn shuffle(&mut self);
}

pub trait Transform<In, Out> {
    fn transform(&mut self, x: In) -> Out;
}

/// A single scene: a `(C, H, W)` image and one latent vector per slot, `(slots, D)`
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub image: Array3<f32>,
    pub latents: Array2<f32>,
}

/// Random access to a fixed number of samples. Sources are read-only, so
/// loaders are free to visit them in any order.
pub trait SampleSource: Send + Sync {
    fn len(&self) -> usize;
    fn get(&self, idx: usize) -> Sample;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn len(&self) -> usize {
        (**self).len()
    }
    fn get(&self, idx: usize) -> Sample {
        (**self).get(idx)
    }
}

/// The three splits every experiment uses. Each one owns a cache directory
/// named after [`DataSplit::dir_name`].
#[derive(Clone, Copy, Debug, EnumIter, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSplit {
    Train,
    TestId,
    TestOod,
}

impl DataSplit {
    /// the name used for the cache paths
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::TestId => "test_id",
            Self::TestOod => "test_ood",
        }
    }

    /// only the training split is reshuffled between epochs
    pub fn shuffles(&self) -> bool {
        matches!(self, Self::Train)
    }

    pub fn all() -> impl Iterator<Item = DataSplit> {
        Self::iter()
    }
}

impl fmt::Display for DataSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Train => "Train",
            Self::TestId => "Test ID",
            Self::TestOod => "Test OOD",
        };
        f.write_str(name)
    }
}
