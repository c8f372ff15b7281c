use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::transforms::{Collate, Identity};
use super::{Batch, Dataset, SampleSource, Transform};
use crate::error::{DataError, Result};

/// Iterates a [`SampleSource`] in mini-batches. The last batch of an epoch
/// holds whatever is left and may be smaller than `batch_size`.
pub struct DataLoader {
    source: Box<dyn SampleSource>,
    order: Vec<usize>,
    idx: usize,
    batch_size: usize,
    shuffling: bool,
    rng: StdRng,
    collate: Collate,
}

impl DataLoader {
    pub fn new(source: Box<dyn SampleSource>, batch_size: usize, shuffle: bool) -> Result<Self> {
        if batch_size == 0 {
            return Err(DataError::InvalidConfig("batch size cannot be zero".into()));
        }
        let order = (0..source.len()).collect();
        let mut loader = Self {
            source,
            order,
            idx: 0,
            batch_size,
            shuffling: shuffle,
            rng: StdRng::from_entropy(),
            collate: Box::new(Identity),
        };
        if shuffle {
            Dataset::shuffle(&mut loader);
        }
        Ok(loader)
    }

    /// Makes the shuffled order reproducible, restarting the epoch
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.order = (0..self.source.len()).collect();
        self.idx = 0;
        if self.shuffling {
            Dataset::shuffle(&mut self);
        }
        self
    }

    /// Replaces the batch assembly step
    pub fn with_collate<T>(mut self, collate: T) -> Self
    where
        T: Transform<Batch, Result<Batch>> + Send + 'static,
    {
        self.collate = Box::new(collate);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffling
    }

    pub fn num_samples(&self) -> usize {
        self.order.len()
    }

    /// Batches per epoch
    pub fn len(&self) -> usize {
        (self.order.len() + self.batch_size - 1) / self.batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn source(&self) -> &dyn SampleSource {
        self.source.as_ref()
    }

    /// The remaining batches of the current epoch
    pub fn batches(&mut self) -> impl Iterator<Item = Result<Batch>> + '_ {
        std::iter::from_fn(move || Dataset::next(self))
    }
}

impl fmt::Debug for DataLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLoader")
            .field("samples", &self.order.len())
            .field("batch_size", &self.batch_size)
            .field("shuffle", &self.shuffling)
            .field("position", &self.idx)
            .finish_non_exhaustive()
    }
}

impl Dataset for DataLoader {
    type DataPoint = Result<Batch>;

    fn next(&mut self) -> Option<Self::DataPoint> {
        if self.idx >= self.order.len() {
            return None;
        }
        let end = (self.idx + self.batch_size).min(self.order.len());
        let samples: Vec<_> = self.order[self.idx..end]
            .iter()
            .map(|&i| self.source.get(i))
            .collect();
        self.idx = end;

        Some(Batch::stack(&samples).and_then(|b| self.collate.transform(b)))
    }

    /// Starts a new epoch, reshuffling if the loader shuffles
    fn reset(&mut self) {
        self.idx = 0;
        if self.shuffling {
            self.shuffle();
        }
    }

    fn shuffle(&mut self) {
        self.order.shuffle(&mut self.rng);
    }
}

impl Iterator for DataLoader {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        Dataset::next(self)
    }
}
