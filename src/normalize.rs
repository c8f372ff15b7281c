//! Maps latent vectors from configuration units into the unit range the
//! models regress on.
//!
//! The sprites world samples eight latents per object, but rotation and two of
//! the three colour channels are held fixed, so they carry no signal and are
//! never part of the regression target. The parameters here only cover the
//! free dimensions, in the order the latent tensors store them.

use std::sync::{Arc, OnceLock};

use ndarray::prelude::*;
use tracing::debug;

use crate::config::SpriteWorldConfig;
use crate::error::{DataError, Result};

/// Indices of the free latents among `total` configured ones: everything up to
/// the last four, then the one three from the end.
pub fn retained_indices(total: usize) -> Result<Vec<usize>> {
    if total < 4 {
        return Err(DataError::InvalidConfig(format!(
            "need at least 4 latent dimensions to drop the fixed ones, got {total}"
        )));
    }
    let mut idx: Vec<usize> = (0..total - 4).collect();
    idx.push(total - 3);
    Ok(idx)
}

/// Per dimension `offset` (the range minimum) and `scale` (max - min) of the
/// free latents. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationParameters {
    offset: Array1<f32>,
    scale: Array1<f32>,
}

impl NormalizationParameters {
    pub fn from_config(config: &SpriteWorldConfig) -> Result<Self> {
        let idx = retained_indices(config.num_latents())?;
        let ranges: Vec<_> = config.get_ranges().map(|(_, rng)| *rng).collect();

        let offset = idx.iter().map(|&i| ranges[i].min).collect();
        let scale = idx.iter().map(|&i| ranges[i].width()).collect();
        Ok(Self { offset, scale })
    }

    /// Builds parameters directly, both vectors must have the same length
    pub fn new(offset: Array1<f32>, scale: Array1<f32>) -> Result<Self> {
        if offset.len() != scale.len() {
            return Err(DataError::LatentDims {
                expected: offset.len(),
                found: scale.len(),
            });
        }
        Ok(Self { offset, scale })
    }

    pub fn offset(&self) -> ArrayView1<'_, f32> {
        self.offset.view()
    }

    pub fn scale(&self) -> ArrayView1<'_, f32> {
        self.scale.view()
    }

    pub fn dims(&self) -> usize {
        self.offset.len()
    }

    fn check_dims<D: Dimension>(&self, latents: &ArrayView<f32, D>) -> Result<()> {
        let found = latents.shape().last().copied().unwrap_or(0);
        if found != self.dims() {
            return Err(DataError::LatentDims {
                expected: self.dims(),
                found,
            });
        }
        Ok(())
    }

    /// `(latents - offset) / scale`, broadcast over every leading axis.
    /// A zero-width range yields non-finite values, it is not checked.
    pub fn apply<D: Dimension>(&self, latents: ArrayView<f32, D>) -> Result<Array<f32, D>> {
        self.check_dims(&latents)?;
        let mut out = latents.to_owned();
        self.normalize_lanes(&mut out);
        Ok(out)
    }

    /// In place version of [`apply`](Self::apply)
    pub fn apply_inplace<D: Dimension>(&self, latents: &mut Array<f32, D>) -> Result<()> {
        self.check_dims(&latents.view())?;
        self.normalize_lanes(latents);
        Ok(())
    }

    fn normalize_lanes<D: Dimension>(&self, latents: &mut Array<f32, D>) {
        for mut lane in latents.lanes_mut(Axis(latents.ndim() - 1)) {
            lane.zip_mut_with(&self.offset, |v, o| *v -= *o);
            lane.zip_mut_with(&self.scale, |v, s| *v /= *s);
        }
    }

    /// `latents * scale + offset`, the inverse of [`apply`](Self::apply)
    pub fn invert<D: Dimension>(&self, latents: ArrayView<f32, D>) -> Result<Array<f32, D>> {
        self.check_dims(&latents)?;
        let mut out = latents.to_owned();
        for mut lane in out.lanes_mut(Axis(out.ndim() - 1)) {
            lane.zip_mut_with(&self.scale, |v, s| *v *= *s);
            lane.zip_mut_with(&self.offset, |v, o| *v += *o);
        }
        Ok(out)
    }
}

/// Owns the latent configuration and derives the normalization parameters
/// from it on first use. The result is computed once and shared afterwards.
#[derive(Debug)]
pub struct LatentNormalizer {
    config: SpriteWorldConfig,
    params: OnceLock<Arc<NormalizationParameters>>,
}

impl LatentNormalizer {
    pub fn new(config: SpriteWorldConfig) -> Self {
        Self {
            config,
            params: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &SpriteWorldConfig {
        &self.config
    }

    pub fn is_computed(&self) -> bool {
        self.params.get().is_some()
    }

    pub fn parameters(&self) -> Result<Arc<NormalizationParameters>> {
        if let Some(params) = self.params.get() {
            return Ok(params.clone());
        }
        let params = NormalizationParameters::from_config(&self.config)?;
        debug!(offset = ?params.offset, scale = ?params.scale, "computed latent normalization");
        Ok(self.params.get_or_init(|| Arc::new(params)).clone())
    }

    pub fn offset(&self) -> Result<Array1<f32>> {
        Ok(self.parameters()?.offset().to_owned())
    }

    pub fn scale(&self) -> Result<Array1<f32>> {
        Ok(self.parameters()?.scale().to_owned())
    }
}
