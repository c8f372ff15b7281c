use std::sync::Arc;

use super::{Batch, Sample, Transform};
use crate::error::Result;
use crate::normalize::NormalizationParameters;

/// Batch assembly step applied by [`DataLoader`](super::DataLoader) after stacking
pub type Collate = Box<dyn Transform<Batch, Result<Batch>> + Send>;

/// Leaves the batch untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transform<Batch, Result<Batch>> for Identity {
    fn transform(&mut self, x: Batch) -> Result<Batch> {
        Ok(x)
    }
}

/// Maps batch latents to `(latents - offset) / scale`, images pass through
#[derive(Debug, Clone)]
pub struct NormalizeLatents {
    params: Arc<NormalizationParameters>,
}

impl NormalizeLatents {
    pub fn new(params: Arc<NormalizationParameters>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &NormalizationParameters {
        &self.params
    }
}

impl Transform<Batch, Result<Batch>> for NormalizeLatents {
    fn transform(&mut self, mut x: Batch) -> Result<Batch> {
        x.latents = self.params.apply(x.latents.view())?;
        Ok(x)
    }
}

/// Stacks `samples` and normalizes their latents in one go
pub fn collate_fn_normalizer(samples: &[Sample], params: &NormalizationParameters) -> Result<Batch> {
    let mut batch = Batch::stack(samples)?;
    batch.latents = params.apply(batch.latents.view())?;
    Ok(batch)
}
