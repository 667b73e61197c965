//! One-shot weight initialization
//!
//! DCGAN-style initialization: every convolutional weight is redrawn from
//! N(0, 0.02²); every normalization scale from N(1, 0.02²) with the shift
//! reset to exactly zero. All other layers are left untouched. Must run once
//! right after a network is constructed, before any optimizer is attached.

use super::layer::{LayerKind, Module};
use crate::latent::standard_normal;
use rand::Rng;

const INIT_STD: f32 = 0.02;

/// Visit every layer of `model` exactly once and reset its parameters in
/// place according to its [`LayerKind`].
pub fn init_weights<R: Rng>(model: &dyn Module, rng: &mut R) {
    model.visit_layers(&mut |layer| match layer.kind() {
        LayerKind::Convolutional => {
            if let Some(weight) = layer.weight() {
                let mut data = weight.data_mut();
                for v in data.iter_mut() {
                    *v = standard_normal(rng) * INIT_STD;
                }
            }
        }
        LayerKind::Normalization => {
            if let Some(scale) = layer.weight() {
                let mut data = scale.data_mut();
                for v in data.iter_mut() {
                    *v = 1.0 + standard_normal(rng) * INIT_STD;
                }
            }
            if let Some(shift) = layer.bias() {
                let mut data = shift.data_mut();
                for v in data.iter_mut() {
                    *v = 0.0;
                }
            }
        }
        LayerKind::Other => {}
    });
}
