//! Layer and module traits

use crate::autograd::Tensor;
use crate::data::ImageBatch;

/// Closed set of layer families the weight initializer dispatches on.
///
/// This replaces type-name string matching: a layer states its family
/// explicitly instead of being probed for "Conv" in its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// Convolutional and transposed-convolutional layers
    Convolutional,
    /// Affine normalization layers (scale + shift)
    Normalization,
    /// Everything else; left untouched by initialization
    Other,
}

/// One differentiable layer in a network.
pub trait Layer {
    /// Apply the layer to a batch
    fn forward(&self, input: &ImageBatch) -> ImageBatch;

    /// Which family this layer belongs to, for initialization dispatch
    fn kind(&self) -> LayerKind {
        LayerKind::Other
    }

    /// All trainable parameters, as shared handles
    fn parameters(&self) -> Vec<Tensor> {
        Vec::new()
    }

    /// Primary parameter: convolution weight, or normalization scale
    fn weight(&self) -> Option<Tensor> {
        None
    }

    /// Secondary parameter: convolution bias, or normalization shift
    fn bias(&self) -> Option<Tensor> {
        None
    }
}

/// A network consumed as a black box: a callable from tensor batch to tensor
/// batch with an enumerable, mutable parameter collection.
///
/// Parameter tensors are shared handles, so in-place mutation (weight
/// initialization, optimizer steps) through the returned collection reaches
/// the network.
pub trait Module {
    /// Run the network on a batch
    fn forward(&self, input: &ImageBatch) -> ImageBatch;

    /// All trainable parameters, in a stable order
    fn parameters(&self) -> Vec<Tensor>;

    /// Visit every layer exactly once, in order
    fn visit_layers(&self, visit: &mut dyn FnMut(&dyn Layer));
}
