//! The Data types that the datasets output and transforms input.
use indicatif::ProgressBar;
use ndarray::prelude::*;

use super::{Sample, SampleSource};
use crate::error::{DataError, Result};

/// Images and latents stacked along the first axis, row `i` of one belongs to
/// row `i` of the other. Images are `(N, C, H, W)`, latents `(N, slots, D)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorDataset {
    images: Array4<f32>,
    latents: Array3<f32>,
}

impl TensorDataset {
    pub fn new(images: Array4<f32>, latents: Array3<f32>) -> Result<Self> {
        let (n_img, n_lat) = (images.len_of(Axis(0)), latents.len_of(Axis(0)));
        if n_img != n_lat {
            return Err(DataError::LengthMismatch {
                images: n_img,
                latents: n_lat,
            });
        }
        Ok(Self { images, latents })
    }

    /// Materializes every sample of `source` in order. The whole dataset is
    /// held in memory, so this only suits datasets that fit in RAM.
    pub fn from_source(source: &dyn SampleSource) -> Result<Self> {
        let n = source.len();
        if n == 0 {
            return Self::new(Array4::zeros((0, 0, 0, 0)), Array3::zeros((0, 0, 0)));
        }
        let first = source.get(0);
        let (c, h, w) = first.image.dim();
        let (s, d) = first.latents.dim();
        let mut images = Array4::<f32>::zeros((n, c, h, w));
        let mut latents = Array3::<f32>::zeros((n, s, d));

        let bar = ProgressBar::new(n as u64);
        for i in 0..n {
            let sample = if i == 0 { first.clone() } else { source.get(i) };
            copy_row(&mut images, &mut latents, i, &sample)?;
            bar.inc(1);
        }
        bar.finish_and_clear();
        Self::new(images, latents)
    }

    pub fn images(&self) -> ArrayView4<'_, f32> {
        self.images.view()
    }

    pub fn latents(&self) -> ArrayView3<'_, f32> {
        self.latents.view()
    }

    pub fn into_parts(self) -> (Array4<f32>, Array3<f32>) {
        (self.images, self.latents)
    }
}

impl SampleSource for TensorDataset {
    fn len(&self) -> usize {
        self.images.len_of(Axis(0))
    }

    fn get(&self, idx: usize) -> Sample {
        Sample {
            image: self.images.index_axis(Axis(0), idx).to_owned(),
            latents: self.latents.index_axis(Axis(0), idx).to_owned(),
        }
    }
}

/// Writes `sample` into row `i`, rejecting samples shaped unlike the rest
fn copy_row(images: &mut Array4<f32>, latents: &mut Array3<f32>, i: usize, sample: &Sample) -> Result<()> {
    let mut img_row = images.index_axis_mut(Axis(0), i);
    if img_row.shape() != sample.image.shape() {
        return Err(DataError::ShapeMismatch {
            index: i,
            what: "image",
            expected: img_row.shape().to_vec(),
            found: sample.image.shape().to_vec(),
        });
    }
    img_row.assign(&sample.image);

    let mut lat_row = latents.index_axis_mut(Axis(0), i);
    if lat_row.shape() != sample.latents.shape() {
        return Err(DataError::ShapeMismatch {
            index: i,
            what: "latent",
            expected: lat_row.shape().to_vec(),
            found: sample.latents.shape().to_vec(),
        });
    }
    lat_row.assign(&sample.latents);
    Ok(())
}

/// A collated mini-batch, images `(B, C, H, W)` and latents `(B, slots, D)`
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub images: Array4<f32>,
    pub latents: Array3<f32>,
}

impl Batch {
    /// Assumes every sample has the same shape and stacks them along a new
    /// first axis.
    pub fn stack(samples: &[Sample]) -> Result<Batch> {
        let first = samples
            .first()
            .ok_or_else(|| DataError::InvalidConfig("cannot collate an empty batch".into()))?;
        let (c, h, w) = first.image.dim();
        let (s, d) = first.latents.dim();
        let b = samples.len();
        let mut images = Array4::<f32>::zeros((b, c, h, w));
        let mut latents = Array3::<f32>::zeros((b, s, d));
        for (i, sample) in samples.iter().enumerate() {
            copy_row(&mut images, &mut latents, i, sample)?;
        }
        Ok(Batch { images, latents })
    }

    pub fn len(&self) -> usize {
        self.images.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
