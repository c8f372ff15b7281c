//! Latent ranges of the sprites world and the options a split loader is built from.

use serde::{Deserialize, Serialize};

use crate::datasets::generator::SampleMode;

/// Inclusive bound of a single latent dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatentRange {
    pub min: f32,
    pub max: f32,
}

impl LatentRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f32 {
        self.max - self.min
    }
}

/// Ordered latent ranges. The order of `ranges` is the order of the latent
/// dimensions in every latent vector, so it must never be re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteWorldConfig {
    pub ranges: Vec<(String, LatentRange)>,
}

impl Default for SpriteWorldConfig {
    fn default() -> Self {
        let ranges = [
            ("x", 0.1, 0.9),
            ("y", 0.2, 0.8),
            ("shape", 0.0, 2.0),
            ("scale", 0.09, 0.22),
            // angle, saturation and value are held fixed while sampling
            ("angle", 0.0, 0.0),
            ("hue", 0.05, 0.95),
            ("sat", 1.0, 1.0),
            ("val", 1.0, 1.0),
        ];
        Self {
            ranges: ranges
                .into_iter()
                .map(|(name, min, max)| (name.to_string(), LatentRange::new(min, max)))
                .collect(),
        }
    }
}

impl SpriteWorldConfig {
    pub fn new(ranges: Vec<(String, LatentRange)>) -> Self {
        Self { ranges }
    }

    /// Ranges in enumeration order
    pub fn get_ranges(&self) -> impl Iterator<Item = (&str, &LatentRange)> {
        self.ranges.iter().map(|(name, rng)| (name.as_str(), rng))
    }

    pub fn num_latents(&self) -> usize {
        self.ranges.len()
    }

    pub fn get(&self, name: &str) -> Option<&LatentRange> {
        self.ranges.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }
}

/// Everything the split loaders need. Fields not listed here are rejected when
/// the options are read from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderOptions {
    pub n_samples_train: usize,
    pub n_samples_test: usize,
    pub n_slots: usize,
    pub sample_mode_train: SampleMode,
    pub sample_mode_test_id: SampleMode,
    pub sample_mode_test_ood: SampleMode,
    pub delta: f32,
    pub no_overlap: bool,
    pub batch_size: usize,
    /// seeds the train shuffle, `None` draws from the thread rng
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            n_samples_train: 100_000,
            n_samples_test: 5_000,
            n_slots: 2,
            sample_mode_train: SampleMode::Random,
            sample_mode_test_id: SampleMode::Diagonal,
            sample_mode_test_ood: SampleMode::OffDiagonal,
            delta: 0.125,
            no_overlap: true,
            batch_size: 64,
            seed: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Config;

    #[test]
    fn default_latent_order() {
        let cfg = SpriteWorldConfig::default();
        let names: Vec<_> = cfg.get_ranges().map(|(n, _)| n).collect();
        assert_eq!(names, ["x", "y", "shape", "scale", "angle", "hue", "sat", "val"]);
        assert_eq!(cfg.get("y"), Some(&LatentRange::new(0.2, 0.8)));
    }

    #[test]
    fn serialize_test() {
        let cfg = SpriteWorldConfig::default();
        let str_repr = cfg.config().unwrap();
        let mut loaded = SpriteWorldConfig::new(Vec::new());
        loaded.load_config(&str_repr).unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn unknown_loader_option_rejected() {
        let src = r#"(
            n_samples_train: 10,
            n_samples_test: 4,
            n_slots: 2,
            sample_mode_train: random,
            sample_mode_test_id: diagonal,
            sample_mode_test_ood: off_diagonal,
            delta: 0.125,
            no_overlap: false,
            batch_size: 3,
            lr: 0.001,
        )"#;
        let mut opts = LoaderOptions::default();
        assert!(opts.load_config(src).is_err());
        assert_eq!(opts, LoaderOptions::default());
    }

    #[test]
    fn loader_options_from_ron() {
        let src = r#"(
            n_samples_train: 10,
            n_samples_test: 4,
            n_slots: 2,
            sample_mode_train: random,
            sample_mode_test_id: diagonal,
            sample_mode_test_ood: off_diagonal,
            delta: 0.125,
            no_overlap: false,
            batch_size: 3,
        )"#;
        let mut opts = LoaderOptions::default();
        opts.load_config(src).unwrap();
        assert_eq!(opts.n_samples_train, 10);
        assert_eq!(opts.sample_mode_test_ood, SampleMode::OffDiagonal);
        assert_eq!(opts.seed, None);
    }
}
