//! On-disk cache of generated splits.
//!
//! A split directory `D` holds `D/images/images.pt` and `D/latents/latents.pt`,
//! each a bincode encoded ndarray. The directory existing is the only signal
//! that a split was cached; a half written directory is not detected.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::prelude::*;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use super::data::TensorDataset;
use super::generator::{GenerationRequest, SampleGenerator};
use super::{DataSplit, Sample, SampleSource};
use crate::config::SpriteWorldConfig;
use crate::error::{DataError, Result};

pub const IMAGES_DIR: &str = "images";
pub const IMAGES_FILE: &str = "images.pt";
pub const LATENTS_DIR: &str = "latents";
pub const LATENTS_FILE: &str = "latents.pt";

pub fn images_path(dir: &Path) -> PathBuf {
    dir.join(IMAGES_DIR).join(IMAGES_FILE)
}

pub fn latents_path(dir: &Path) -> PathBuf {
    dir.join(LATENTS_DIR).join(LATENTS_FILE)
}

fn read_tensor<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|source| DataError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    bincode::deserialize_from(BufReader::new(file)).map_err(|source| DataError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn write_tensor<T: Serialize>(path: &Path, tensor: &T) -> Result<()> {
    let save_err = |source| DataError::Save {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(save_err)?);
    bincode::serialize_into(&mut writer, tensor).map_err(|source| DataError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(save_err)
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| DataError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Materializes `dataset` and writes it to `path` as an images and a latents
/// tensor. Every sample is held in memory before anything is written.
pub fn dump_generated_dataset(dataset: &dyn SampleSource, path: &Path) -> Result<TensorDataset> {
    debug!("stacking {} samples for {}", dataset.len(), path.display());
    // a sample that fails to stack must not leave an empty split directory behind
    let stacked = TensorDataset::from_source(dataset)?;

    create_dir(&path.join(IMAGES_DIR))?;
    create_dir(&path.join(LATENTS_DIR))?;
    write_tensor(&images_path(path), &stacked.images())?;
    write_tensor(&latents_path(path), &stacked.latents())?;
    info!("Dumped {} samples to {}.", stacked.len(), path.display());
    Ok(stacked)
}

/// A split read back from its cache directory
#[derive(Debug, Clone)]
pub struct PreGeneratedDataset {
    path: PathBuf,
    data: TensorDataset,
}

impl PreGeneratedDataset {
    /// Reads both tensors. Any missing or unreadable file is an error, the
    /// split is never regenerated from here.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let images: Array4<f32> = read_tensor(&images_path(&path))?;
        let latents: Array3<f32> = read_tensor(&latents_path(&path))?;
        let data = TensorDataset::new(images, latents)?;
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &TensorDataset {
        &self.data
    }
}

impl SampleSource for PreGeneratedDataset {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn get(&self, idx: usize) -> Sample {
        self.data.get(idx)
    }
}

/// Returns the samples of one split: read from `split_dir` when `load` is set
/// and the directory exists, otherwise freshly generated and, when `save` is
/// set, written to `split_dir` first. A generator returning anything but
/// `request.n_samples` samples is an error and nothing is saved.
pub fn obtain(
    split: DataSplit,
    split_dir: &Path,
    generator: &dyn SampleGenerator,
    request: &GenerationRequest,
    config: &SpriteWorldConfig,
    load: bool,
    save: bool,
) -> Result<Box<dyn SampleSource>> {
    if load && split_dir.is_dir() {
        let dataset = PreGeneratedDataset::load(split_dir)?;
        info!("{} dataset successfully loaded from {}.", split, split_dir.display());
        return Ok(Box::new(dataset));
    }

    debug!(
        n_samples = request.n_samples,
        mode = %request.sample_mode,
        "generating dataset for {}",
        split_dir.display()
    );
    let generated = generator.generate(request, config).map_err(DataError::Generator)?;
    if generated.len() != request.n_samples {
        return Err(DataError::SampleCount {
            expected: request.n_samples,
            found: generated.len(),
        });
    }
    if save {
        // the stacked copy is already in memory, serve from it
        let stacked = dump_generated_dataset(&*generated, split_dir)?;
        return Ok(Box::new(stacked));
    }
    Ok(generated)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::datasets::generator::SampleMode;
    use ndarray_rand::{rand_distr::Uniform, RandomExt};

    fn request(n_samples: usize) -> GenerationRequest {
        GenerationRequest {
            n_samples,
            n_slots: 2,
            sample_mode: SampleMode::Random,
            delta: 0.125,
            no_overlap: true,
        }
    }

    /// `n` samples, sample `bad` has three latent rows instead of two
    struct Ragged {
        n: usize,
        bad: Option<usize>,
    }

    impl SampleSource for Ragged {
        fn len(&self) -> usize {
            self.n
        }

        fn get(&self, idx: usize) -> Sample {
            let slots = if Some(idx) == self.bad { 3 } else { 2 };
            Sample {
                image: Array3::zeros((3, 4, 4)),
                latents: Array2::from_elem((slots, 5), idx as f32),
            }
        }
    }

    fn ragged(n: usize, bad: Option<usize>) -> impl SampleGenerator {
        move |_: &GenerationRequest, _: &SpriteWorldConfig| -> anyhow::Result<Box<dyn SampleSource>> {
            Ok(Box::new(Ragged { n, bad }))
        }
    }

    #[test]
    fn roundtrip_is_bit_exact() {
        let dir = tempfile::tempdir().unwrap();
        let ds = TensorDataset::new(
            Array::random((6, 3, 64, 64), Uniform::new(0.0, 1.0)),
            Array::random((6, 2, 5), Uniform::new(-3.0, 3.0)),
        )
        .unwrap();
        dump_generated_dataset(&ds, dir.path()).unwrap();
        assert!(images_path(dir.path()).is_file());
        assert!(latents_path(dir.path()).is_file());

        let loaded = PreGeneratedDataset::load(dir.path()).unwrap();
        assert_eq!(loaded.len(), 6);
        for i in 0..6 {
            let (a, b) = (ds.get(i), loaded.get(i));
            assert!(a.image.iter().zip(b.image.iter()).all(|(x, y)| x.to_bits() == y.to_bits()));
            assert!(a.latents.iter().zip(b.latents.iter()).all(|(x, y)| x.to_bits() == y.to_bits()));
        }
    }

    #[test]
    fn missing_latents_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        create_dir(&dir.path().join(IMAGES_DIR)).unwrap();
        write_tensor(&images_path(dir.path()), &Array4::<f32>::zeros((1, 3, 2, 2))).unwrap();
        let err = PreGeneratedDataset::load(dir.path()).unwrap_err();
        assert!(matches!(err, DataError::Load { .. }));
    }

    #[test]
    fn corrupt_tensor_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        create_dir(&dir.path().join(IMAGES_DIR)).unwrap();
        create_dir(&dir.path().join(LATENTS_DIR)).unwrap();
        fs::write(images_path(dir.path()), b"not a tensor").unwrap();
        fs::write(latents_path(dir.path()), b"not a tensor").unwrap();
        let err = PreGeneratedDataset::load(dir.path()).unwrap_err();
        assert!(matches!(err, DataError::Decode { .. }));
    }

    #[test]
    fn mismatched_rows_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        create_dir(&dir.path().join(IMAGES_DIR)).unwrap();
        create_dir(&dir.path().join(LATENTS_DIR)).unwrap();
        write_tensor(&images_path(dir.path()), &Array4::<f32>::zeros((3, 3, 2, 2))).unwrap();
        write_tensor(&latents_path(dir.path()), &Array3::<f32>::zeros((2, 2, 5))).unwrap();
        let err = PreGeneratedDataset::load(dir.path()).unwrap_err();
        assert!(matches!(err, DataError::LengthMismatch { images: 3, latents: 2 }));
    }

    #[test]
    fn failed_dump_leaves_no_split_dir() {
        let root = tempfile::tempdir().unwrap();
        let split = root.path().join("train");
        let cfg = SpriteWorldConfig::default();

        let err = obtain(DataSplit::Train, &split, &ragged(4, Some(1)), &request(4), &cfg, true, true).err().unwrap();
        assert!(matches!(err, DataError::ShapeMismatch { index: 1, what: "latent", .. }));
        assert!(!split.exists());

        let source = obtain(DataSplit::Train, &split, &ragged(4, None), &request(4), &cfg, true, true).unwrap();
        assert_eq!(source.len(), 4);
        assert_eq!(PreGeneratedDataset::load(&split).unwrap().len(), 4);
    }

    #[test]
    fn short_generator_output_is_not_cached() {
        let root = tempfile::tempdir().unwrap();
        let split = root.path().join("test_id");
        let cfg = SpriteWorldConfig::default();

        let err = obtain(DataSplit::TestId, &split, &ragged(3, None), &request(10), &cfg, false, true).err().unwrap();
        assert!(matches!(err, DataError::SampleCount { expected: 10, found: 3 }));
        assert!(!split.exists());
    }
}
