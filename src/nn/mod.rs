//! Network building blocks behind the black-box `Module` seam
//!
//! The trainer never looks inside a network: it sees a [`Module`] (a callable
//! from image batch to image batch with enumerable parameters) and, for
//! one-shot weight initialization, a visitable tree of [`Layer`]s tagged with
//! a closed [`LayerKind`] set.

mod activation;
mod conv;
mod init;
mod layer;
mod norm;
mod sequential;

pub use activation::{LeakyRelu, Relu, Tanh};
pub use conv::{Conv2d, ConvTranspose2d};
pub use init::init_weights;
pub use layer::{Layer, LayerKind, Module};
pub use norm::BatchNorm2d;
pub use sequential::Sequential;
