//! Ordered stack of layers

use super::layer::{Layer, Module};
use crate::autograd::Tensor;
use crate::data::ImageBatch;

/// A network built as an ordered stack of layers.
#[derive(Default)]
pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
}

impl Sequential {
    /// Create an empty stack
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append a layer, builder-style
    #[must_use]
    pub fn push(mut self, layer: impl Layer + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }

    /// Number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the stack has no layers
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Module for Sequential {
    fn forward(&self, input: &ImageBatch) -> ImageBatch {
        let mut x = input.clone();
        for layer in &self.layers {
            x = layer.forward(&x);
        }
        x
    }

    fn parameters(&self) -> Vec<Tensor> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }

    fn visit_layers(&self, visit: &mut dyn FnMut(&dyn Layer)) {
        for layer in &self.layers {
            visit(layer.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{BatchNorm2d, Conv2d, LeakyRelu};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sequential_chains_layers() {
        let mut rng = StdRng::seed_from_u64(42);
        let net = Sequential::new()
            .push(Conv2d::new(3, 8, 4, 2, 1, &mut rng))
            .push(BatchNorm2d::new(8))
            .push(LeakyRelu::new(0.2));
        let out = net.forward(&ImageBatch::zeros([2, 3, 8, 8]));
        assert_eq!(out.shape(), [2, 8, 4, 4]);
    }

    #[test]
    fn test_sequential_collects_all_parameters() {
        let mut rng = StdRng::seed_from_u64(42);
        let net = Sequential::new()
            .push(Conv2d::new(1, 2, 3, 1, 1, &mut rng))
            .push(BatchNorm2d::new(2));
        // conv weight + bias, bn gamma + beta
        assert_eq!(net.parameters().len(), 4);
    }

    #[test]
    fn test_visit_layers_sees_each_layer_once() {
        let mut rng = StdRng::seed_from_u64(42);
        let net = Sequential::new()
            .push(Conv2d::new(1, 1, 1, 1, 0, &mut rng))
            .push(LeakyRelu::new(0.2))
            .push(BatchNorm2d::new(1));
        let mut count = 0;
        net.visit_layers(&mut |_| count += 1);
        assert_eq!(count, 3);
    }
}
