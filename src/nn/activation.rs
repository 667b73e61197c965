//! Parameter-free activation layers

use super::layer::Layer;
use crate::autograd::ops::{leaky_relu, relu, tanh};
use crate::data::ImageBatch;

/// ReLU layer
pub struct Relu;

impl Layer for Relu {
    fn forward(&self, input: &ImageBatch) -> ImageBatch {
        ImageBatch::new(relu(input.tensor()), input.shape())
    }
}

/// Leaky ReLU layer
pub struct LeakyRelu {
    negative_slope: f32,
}

impl LeakyRelu {
    /// Create with the given negative slope (0.2 is the usual GAN choice)
    pub fn new(negative_slope: f32) -> Self {
        Self { negative_slope }
    }
}

impl Layer for LeakyRelu {
    fn forward(&self, input: &ImageBatch) -> ImageBatch {
        ImageBatch::new(leaky_relu(input.tensor(), self.negative_slope), input.shape())
    }
}

/// Tanh layer, the generator's output squash into [-1, 1]
pub struct Tanh;

impl Layer for Tanh {
    fn forward(&self, input: &ImageBatch) -> ImageBatch {
        ImageBatch::new(tanh(input.tensor()), input.shape())
    }
}
