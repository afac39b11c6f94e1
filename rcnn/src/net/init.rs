use crate::dtype::DType;
use crate::tensor::{Dims, Tensor};
use rand::SeedableRng;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand_distr::Normal;

/// He weight initialization: `N(0, sqrt(2 / fan_in))`, zero biases.
pub struct HeInitializer {
    rng: StdRng,
}

impl HeInitializer {
    pub fn seed_from_u64(seed: u64) -> Self {
        HeInitializer {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn weights<T: DType>(&mut self, dims: Dims, fan_in: usize) -> Tensor<T> {
        assert!(fan_in > 0, "fan-in must be positive");
        let std = (2.0 / fan_in as f64).sqrt();
        let dist = Normal::new(0.0, std).unwrap();
        let data: Vec<T> = dist
            .sample_iter(&mut self.rng)
            .take(dims.size())
            .map(T::from_f64)
            .collect();
        Tensor::from_vec(data, dims)
    }

    pub fn biases<T: DType>(&self, dims: Dims) -> Tensor<T> {
        Tensor::zeroed(dims)
    }
}

impl Default for HeInitializer {
    fn default() -> Self {
        HeInitializer {
            rng: StdRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::HeInitializer;
    use crate::tensor::Dims;

    #[test]
    fn test_seeded_init_is_reproducible() {
        let mut a = HeInitializer::seed_from_u64(42);
        let mut b = HeInitializer::seed_from_u64(42);
        let wa = a.weights::<f64>(Dims::D2(10, 10), 10);
        let wb = b.weights::<f64>(Dims::D2(10, 10), 10);
        assert_eq!(wa, wb);
    }

    #[test]
    fn test_spread_tracks_fan_in() {
        let mut init = HeInitializer::seed_from_u64(7);
        let w = init.weights::<f64>(Dims::D2(100, 100), 50);
        let n = w.len() as f64;
        let mean: f64 = w.as_ref().iter().sum::<f64>() / n;
        let var: f64 = w.as_ref().iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        // expected variance 2/50 = 0.04
        assert!((var - 0.04).abs() < 0.01, "sample variance {var} far from 0.04");
        assert!(mean.abs() < 0.01);
    }

    #[test]
    fn test_biases_are_zero() {
        let init = HeInitializer::seed_from_u64(0);
        let b = init.biases::<f32>(Dims::D1(16));
        assert!(b.as_ref().iter().all(|&v| v == 0.0));
    }
}
