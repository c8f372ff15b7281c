use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::SampleSource;
use crate::config::SpriteWorldConfig;

/// How latents are drawn for a split. The snake case name doubles as the
/// directory key of the identifiability datasets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SampleMode {
    Random,
    Diagonal,
    OffDiagonal,
    PureOffDiagonal,
}

/// Everything a generator needs to synthesize one split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub n_samples: usize,
    pub n_slots: usize,
    pub sample_mode: SampleMode,
    pub delta: f32,
    pub no_overlap: bool,
}

/// Renders sprites world scenes. Implementations must return exactly
/// `request.n_samples` samples, each with `request.n_slots` latent rows.
pub trait SampleGenerator {
    fn generate(
        &self,
        request: &GenerationRequest,
        config: &SpriteWorldConfig,
    ) -> anyhow::Result<Box<dyn SampleSource>>;
}

impl<F> SampleGenerator for F
where
    F: Fn(&GenerationRequest, &SpriteWorldConfig) -> anyhow::Result<Box<dyn SampleSource>>,
{
    fn generate(
        &self,
        request: &GenerationRequest,
        config: &SpriteWorldConfig,
    ) -> anyhow::Result<Box<dyn SampleSource>> {
        self(request, config)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn mode_names() {
        let names: Vec<_> = SampleMode::iter().map(|m| m.to_string()).collect();
        assert_eq!(names, ["random", "diagonal", "off_diagonal", "pure_off_diagonal"]);
        assert_eq!(SampleMode::from_str("off_diagonal").unwrap(), SampleMode::OffDiagonal);
    }
}
