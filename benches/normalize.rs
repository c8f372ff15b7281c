#[macro_use]
extern crate bencher;

use bencher::Bencher;

use ndarray::prelude::*;
use ndarray_rand::{rand_distr::Uniform, RandomExt};

use spriteworld_lib::config::SpriteWorldConfig;
use spriteworld_lib::datasets::transforms::collate_fn_normalizer;
use spriteworld_lib::datasets::{Sample, SampleSource, TensorDataset};
use spriteworld_lib::normalize::NormalizationParameters;

fn params() -> NormalizationParameters {
    NormalizationParameters::from_config(&SpriteWorldConfig::default()).unwrap()
}

fn bench_apply(bench: &mut Bencher) {
    let params = params();
    let latents: Array3<f32> = Array::random((128, 2, 5), Uniform::new(0.0, 1.0));
    bench.iter(|| params.apply(latents.view()).unwrap())
}

fn bench_apply_inplace(bench: &mut Bencher) {
    let params = params();
    let mut latents: Array3<f32> = Array::random((128, 2, 5), Uniform::new(0.0, 1.0));
    bench.iter(|| params.apply_inplace(&mut latents).unwrap())
}

fn bench_collate(bench: &mut Bencher) {
    let params = params();
    let ds = TensorDataset::new(
        Array::random((128, 3, 64, 64), Uniform::new(0.0, 1.0)),
        Array::random((128, 2, 5), Uniform::new(0.0, 1.0)),
    )
    .unwrap();
    let samples: Vec<Sample> = (0..ds.len()).map(|i| ds.get(i)).collect();
    bench.iter(|| collate_fn_normalizer(&samples, &params).unwrap())
}

benchmark_group!(benches, bench_apply, bench_apply_inplace, bench_collate);
benchmark_main!(benches);
