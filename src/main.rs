use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ndarray::prelude::*;
use tracing_subscriber::EnvFilter;

use spriteworld_lib::config::SpriteWorldConfig;
use spriteworld_lib::datasets::{DataLoader, PreGeneratedDataset, SampleSource};
use spriteworld_lib::datasets::transforms::NormalizeLatents;
use spriteworld_lib::read_config;

#[derive(Parser)]
#[command(name = "spriteworld")]
#[command(about = "Inspect cached sprites world splits and their latent normalization")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RON file with the latent ranges, defaults to the built-in sprites world ranges
    #[arg(short, long, env = "SPRITEWORLD_CONFIG", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the offset and scale applied to latent vectors
    Normalization,
    /// Load a cached split and report the range of its normalized latents
    Inspect {
        /// Split directory holding images/ and latents/
        dir: PathBuf,
        #[arg(short, long, default_value_t = 128)]
        batch_size: usize,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<SpriteWorldConfig> {
    match path {
        Some(path) => read_config(path),
        None => Ok(SpriteWorldConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("spriteworld_lib=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let normalizer = spriteworld_lib::normalize::LatentNormalizer::new(config);
    let params = normalizer.parameters()?;

    match cli.command {
        Commands::Normalization => {
            println!("offset: {}", params.offset());
            println!("scale:  {}", params.scale());
        }
        Commands::Inspect { dir, batch_size } => {
            let dataset = PreGeneratedDataset::load(&dir)
                .with_context(|| format!("Failed to load split at {}", dir.display()))?;
            println!("samples: {}", dataset.len());
            println!("images:  {:?}", dataset.data().images().shape());
            println!("latents: {:?}", dataset.data().latents().shape());

            let loader = DataLoader::new(Box::new(dataset), batch_size, false)?
                .with_collate(NormalizeLatents::new(params.clone()));
            let mut lo = Array1::<f32>::from_elem(params.dims(), f32::INFINITY);
            let mut hi = Array1::<f32>::from_elem(params.dims(), f32::NEG_INFINITY);
            for batch in loader {
                let batch = batch?;
                for lane in batch.latents.lanes(Axis(2)) {
                    lo.zip_mut_with(&lane, |a, b| *a = a.min(*b));
                    hi.zip_mut_with(&lane, |a, b| *a = a.max(*b));
                }
            }
            println!("normalized min: {}", lo);
            println!("normalized max: {}", hi);
        }
    }
    Ok(())
}
