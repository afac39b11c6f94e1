//! Deterministic fixtures for the benchmark suite.

use crate::dtype::DType;
use crate::tensor::{Dims, Tensor};
use rand::SeedableRng;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

pub const SIZE_LG: usize = 512;
pub const SIZE_MD: usize = 128;
pub const SIZE_SM: usize = 32;

const SEED: u64 = 0x8371943;

pub fn get_square_matrices<T: DType>(size: usize) -> [Tensor<T>; 3]
where
    StandardNormal: Distribution<T>,
{
    let mut rng = StdRng::seed_from_u64(SEED);
    [
        Tensor::from_distribution(&mut rng, StandardNormal, Dims::D2(size, size)),
        Tensor::from_distribution(&mut rng, StandardNormal, Dims::D2(size, size)),
        Tensor::zeroed(Dims::D2(size, size)),
    ]
}

/// A seeded MNIST-shaped image batch.
pub fn get_image_batch<T: DType>(batch: usize) -> Tensor<T>
where
    StandardNormal: Distribution<T>,
{
    let mut rng = StdRng::seed_from_u64(SEED);
    Tensor::from_distribution(&mut rng, StandardNormal, Dims::D4(batch, 1, 28, 28))
}
