//! Adversarial training orchestrator.
//!
//! [`Gan`] owns a generator/discriminator pair, the hyperparameters, and the
//! fixed preview latent batch. [`Gan::train`] runs the smoothed-label
//! training loop against a [`crate::data::DataLoader`]; [`Gan::generate`]
//! samples images without gradient tracking.

mod config;
#[allow(clippy::module_inception)]
mod gan;

pub use config::{GanConfig, GenerateOptions, TrainOptions};
pub use gan::{Gan, Generated, FAKE_LABEL, REAL_LABEL};
