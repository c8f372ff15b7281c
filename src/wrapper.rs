//! Train / test loaders for the sprites world, backed by the on-disk cache.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tracing::info;

use crate::config::{LoaderOptions, SpriteWorldConfig};
use crate::datasets::cache::{obtain, PreGeneratedDataset};
use crate::datasets::generator::{GenerationRequest, SampleGenerator, SampleMode};
use crate::datasets::transforms::NormalizeLatents;
use crate::datasets::{DataLoader, DataSplit, SampleSource};
use crate::error::{DataError, Result};
use crate::normalize::{LatentNormalizer, NormalizationParameters};

/// Batch size of every identifiability loader
pub const IDENTIFIABILITY_BATCH_SIZE: usize = 128;

/// Hands out one loader per split. Splits are cached under `path/<split>`,
/// all loaders share the same normalization parameters.
#[derive(Debug)]
pub struct SpritesWorldDataWrapper {
    path: PathBuf,
    load: bool,
    save: bool,
    normalizer: LatentNormalizer,
    identifiability_path: OnceLock<PathBuf>,
}

impl SpritesWorldDataWrapper {
    pub fn new(path: impl Into<PathBuf>, load: bool, save: bool) -> Self {
        Self::with_config(path, load, save, SpriteWorldConfig::default())
    }

    pub fn with_config(path: impl Into<PathBuf>, load: bool, save: bool, config: SpriteWorldConfig) -> Self {
        Self {
            path: path.into(),
            load,
            save,
            normalizer: LatentNormalizer::new(config),
            identifiability_path: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &SpriteWorldConfig {
        self.normalizer.config()
    }

    pub fn normalization(&self) -> Result<Arc<NormalizationParameters>> {
        self.normalizer.parameters()
    }

    pub fn split_dir(&self, split: DataSplit) -> PathBuf {
        self.path.join(split.dir_name())
    }

    fn request(opts: &LoaderOptions, split: DataSplit) -> GenerationRequest {
        let (n_samples, sample_mode) = match split {
            DataSplit::Train => (opts.n_samples_train, opts.sample_mode_train),
            DataSplit::TestId => (opts.n_samples_test, opts.sample_mode_test_id),
            DataSplit::TestOod => (opts.n_samples_test, opts.sample_mode_test_ood),
        };
        GenerationRequest {
            n_samples,
            n_slots: opts.n_slots,
            sample_mode,
            delta: opts.delta,
            no_overlap: opts.no_overlap,
        }
    }

    fn normalized_loader(
        &self,
        source: Box<dyn SampleSource>,
        batch_size: usize,
        shuffle: bool,
        seed: Option<u64>,
    ) -> Result<DataLoader> {
        let collate = NormalizeLatents::new(self.normalization()?);
        let loader = DataLoader::new(source, batch_size, shuffle)?.with_collate(collate);
        Ok(match seed {
            Some(seed) => loader.with_seed(seed),
            None => loader,
        })
    }

    /// Loader for `split`, generating (and possibly caching) it when it is
    /// not loaded from disk
    pub fn get_loader(
        &self,
        split: DataSplit,
        opts: &LoaderOptions,
        generator: &dyn SampleGenerator,
    ) -> Result<DataLoader> {
        let dir = self.split_dir(split);
        let request = Self::request(opts, split);
        let source = obtain(split, &dir, generator, &request, self.config(), self.load, self.save)?;
        info!("{} dataset ready with {} samples.", split, source.len());
        self.normalized_loader(source, opts.batch_size, split.shuffles(), opts.seed)
    }

    pub fn get_train_loader(&self, opts: &LoaderOptions, generator: &dyn SampleGenerator) -> Result<DataLoader> {
        self.get_loader(DataSplit::Train, opts, generator)
    }

    pub fn get_test_id_loader(&self, opts: &LoaderOptions, generator: &dyn SampleGenerator) -> Result<DataLoader> {
        self.get_loader(DataSplit::TestId, opts, generator)
    }

    pub fn get_test_ood_loader(&self, opts: &LoaderOptions, generator: &dyn SampleGenerator) -> Result<DataLoader> {
        self.get_loader(DataSplit::TestOod, opts, generator)
    }

    pub fn identifiability_path(&self) -> Option<&Path> {
        self.identifiability_path.get().map(PathBuf::as_path)
    }

    /// Root of the identifiability datasets, can only be set once
    pub fn set_identifiability_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.identifiability_path
            .set(path.into())
            .map_err(|_| DataError::IdentifiabilityPathAlreadySet)
    }

    /// Loads `identifiability_path/<sample_mode>/<split>`, never generating it
    pub fn get_identifiability_loader(&self, split: DataSplit, sample_mode: SampleMode) -> Result<DataLoader> {
        let root = self
            .identifiability_path()
            .ok_or(DataError::IdentifiabilityPathNotSet)?;
        let dir = root.join(sample_mode.to_string()).join(split.dir_name());
        let dataset = PreGeneratedDataset::load(&dir)?;
        info!("Identifiability dataset successfully loaded from {}.", dir.display());
        self.normalized_loader(Box::new(dataset), IDENTIFIABILITY_BATCH_SIZE, false, None)
    }

    pub fn get_identifiability_train_loader(&self, sample_mode_train: SampleMode) -> Result<DataLoader> {
        self.get_identifiability_loader(DataSplit::Train, sample_mode_train)
    }

    pub fn get_identifiability_test_id_loader(&self, sample_mode_test_id: SampleMode) -> Result<DataLoader> {
        self.get_identifiability_loader(DataSplit::TestId, sample_mode_test_id)
    }

    pub fn get_identifiability_test_ood_loader(&self, sample_mode_test_ood: SampleMode) -> Result<DataLoader> {
        self.get_identifiability_loader(DataSplit::TestOod, sample_mode_test_ood)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identifiability_path_set_once() {
        let wrapper = SpritesWorldDataWrapper::new("data", false, false);
        assert!(wrapper.identifiability_path().is_none());
        wrapper.set_identifiability_path("first").unwrap();
        let err = wrapper.set_identifiability_path("second").unwrap_err();
        assert!(matches!(err, DataError::IdentifiabilityPathAlreadySet));
        assert_eq!(wrapper.identifiability_path(), Some(Path::new("first")));
    }

    #[test]
    fn identifiability_loader_needs_path() {
        let wrapper = SpritesWorldDataWrapper::new("data", true, false);
        let err = wrapper.get_identifiability_train_loader(SampleMode::Random).unwrap_err();
        assert!(matches!(err, DataError::IdentifiabilityPathNotSet));
    }

    #[test]
    fn split_requests() {
        let opts = LoaderOptions::default();
        let req = SpritesWorldDataWrapper::request(&opts, DataSplit::TestOod);
        assert_eq!(req.n_samples, opts.n_samples_test);
        assert_eq!(req.sample_mode, opts.sample_mode_test_ood);
        let req = SpritesWorldDataWrapper::request(&opts, DataSplit::Train);
        assert_eq!(req.n_samples, opts.n_samples_train);
        assert_eq!(req.n_slots, 2);
    }

    #[test]
    fn split_dirs_under_root() {
        let wrapper = SpritesWorldDataWrapper::new("/tmp/sprites", true, true);
        assert_eq!(wrapper.split_dir(DataSplit::TestId), Path::new("/tmp/sprites/test_id"));
    }
}
