//! Autograd operations with backward passes
//!
//! This module provides the differentiable operations the image networks are
//! built from. Each forward attaches a backward op that accumulates
//! gradients into its inputs and recurses down the tape.

mod activations;
mod conv;
mod norm;

pub use activations::{leaky_relu, relu, tanh};
pub use conv::{conv2d, conv_transpose2d, ConvDims, ConvTransposeDims};
pub use norm::{batch_norm2d, BatchNormDims};
