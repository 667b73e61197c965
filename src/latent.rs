//! Latent batches for the generator's input space

use crate::autograd::Tensor;
use crate::data::ImageBatch;
use rand::Rng;

/// Draw one standard-normal value via the Box-Muller transform
pub(crate) fn standard_normal<R: Rng>(rng: &mut R) -> f32 {
    let u1: f64 = rng.random::<f64>().max(1e-10);
    let u2: f64 = rng.random::<f64>();
    ((-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()) as f32
}

/// A batch of latent vectors, each drawn from N(0, I).
#[derive(Clone)]
pub struct LatentBatch {
    data: Tensor,
    batch: usize,
    dim: usize,
}

impl LatentBatch {
    /// Sample `batch` latent vectors of length `dim`
    pub fn sample<R: Rng>(rng: &mut R, batch: usize, dim: usize) -> Self {
        let values: Vec<f32> = (0..batch * dim).map(|_| standard_normal(rng)).collect();
        Self {
            data: Tensor::from_vec(values, false),
            batch,
            dim,
        }
    }

    /// Number of latent vectors
    pub fn batch_size(&self) -> usize {
        self.batch
    }

    /// Dimensionality of each latent vector
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The underlying flat tensor
    pub fn tensor(&self) -> &Tensor {
        &self.data
    }

    /// View as a rank-4 batch of shape (batch, dim, 1, 1).
    ///
    /// The trailing unit dimensions exist only to match the generator's
    /// expected spatial input shape; storage is shared.
    pub fn as_images(&self) -> ImageBatch {
        ImageBatch::new(self.data.clone(), [self.batch, self.dim, 1, 1])
    }
}

impl std::fmt::Debug for LatentBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatentBatch")
            .field("batch", &self.batch)
            .field("dim", &self.dim)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_dimensions() {
        let mut rng = StdRng::seed_from_u64(42);
        let z = LatentBatch::sample(&mut rng, 6, 128);
        assert_eq!(z.batch_size(), 6);
        assert_eq!(z.dim(), 128);
        assert_eq!(z.tensor().len(), 6 * 128);
    }

    #[test]
    fn test_as_images_is_rank4_with_unit_tail() {
        let mut rng = StdRng::seed_from_u64(42);
        let z = LatentBatch::sample(&mut rng, 4, 16);
        let images = z.as_images();
        assert_eq!(images.shape(), [4, 16, 1, 1]);
        // Shared storage, no copy
        z.tensor().data_mut()[0] = 99.0;
        assert_eq!(images.tensor().data()[0], 99.0);
    }

    #[test]
    fn test_samples_look_standard_normal() {
        let mut rng = StdRng::seed_from_u64(7);
        let z = LatentBatch::sample(&mut rng, 64, 128);
        let values = z.tensor().to_vec();
        let n = values.len() as f32;
        let mean: f32 = values.iter().sum::<f32>() / n;
        let var: f32 = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        assert!(mean.abs() < 0.05, "sample mean = {mean}");
        assert!((var - 1.0).abs() < 0.08, "sample variance = {var}");
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let mut rng_a = StdRng::seed_from_u64(11);
        let mut rng_b = StdRng::seed_from_u64(11);
        let a = LatentBatch::sample(&mut rng_a, 3, 8);
        let b = LatentBatch::sample(&mut rng_b, 3, 8);
        assert_eq!(a.tensor().to_vec(), b.tensor().to_vec());
    }
}
