//! Batch normalization layer

use super::layer::{Layer, LayerKind};
use crate::autograd::ops::{batch_norm2d, BatchNormDims};
use crate::autograd::Tensor;
use crate::data::ImageBatch;

/// Per-channel batch normalization with learned scale (gamma) and shift (beta)
pub struct BatchNorm2d {
    gamma: Tensor,
    beta: Tensor,
    channels: usize,
    epsilon: f32,
}

impl BatchNorm2d {
    /// Create a layer with identity affine parameters (gamma=1, beta=0)
    pub fn new(channels: usize) -> Self {
        Self {
            gamma: Tensor::from_vec(vec![1.0; channels], true),
            beta: Tensor::zeros(channels, true),
            channels,
            epsilon: 1e-5,
        }
    }
}

impl Layer for BatchNorm2d {
    fn forward(&self, input: &ImageBatch) -> ImageBatch {
        let [batch, channels, h, w] = input.shape();
        assert_eq!(channels, self.channels, "BatchNorm2d channel mismatch");
        let dims = BatchNormDims { batch, channels, h, w };
        let out = batch_norm2d(input.tensor(), &self.gamma, &self.beta, &dims, self.epsilon);
        ImageBatch::new(out, input.shape())
    }

    fn kind(&self) -> LayerKind {
        LayerKind::Normalization
    }

    fn parameters(&self) -> Vec<Tensor> {
        vec![self.gamma.clone(), self.beta.clone()]
    }

    fn weight(&self) -> Option<Tensor> {
        Some(self.gamma.clone())
    }

    fn bias(&self) -> Option<Tensor> {
        Some(self.beta.clone())
    }
}
