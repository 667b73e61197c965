//! Configuration and per-call options for the GAN orchestrator.

use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::error::{GanError, Result};

/// Hyperparameters fixed at orchestrator construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GanConfig {
    /// Dimensionality of the latent space
    pub latent_dim: usize,
    /// Print a loss line every this many training steps
    pub log_every: usize,
    /// Generator learning rate
    pub gen_lr: f32,
    /// Discriminator learning rate
    pub dis_lr: f32,
    /// Adam momentum pair for the generator
    pub gen_betas: (f32, f32),
    /// Adam momentum pair for the discriminator
    pub dis_betas: (f32, f32),
}

impl Default for GanConfig {
    fn default() -> Self {
        Self {
            latent_dim: 128,
            log_every: 25,
            gen_lr: 2e-4,
            dis_lr: 2e-4,
            gen_betas: (0.5, 0.999),
            dis_betas: (0.5, 0.999),
        }
    }
}

impl GanConfig {
    /// Check every hyperparameter before any network or optimizer is built
    pub fn validate(&self) -> Result<()> {
        if self.latent_dim == 0 {
            return Err(GanError::InvalidHyperparameter(
                "latent_dim must be positive".into(),
            ));
        }
        if self.log_every == 0 {
            return Err(GanError::InvalidHyperparameter(
                "log_every must be positive".into(),
            ));
        }
        for (name, lr) in [("gen_lr", self.gen_lr), ("dis_lr", self.dis_lr)] {
            if !(lr > 0.0 && lr.is_finite()) {
                return Err(GanError::InvalidHyperparameter(format!(
                    "{name} must be positive and finite, got {lr}"
                )));
            }
        }
        for (name, betas) in [("gen_betas", self.gen_betas), ("dis_betas", self.dis_betas)] {
            for beta in [betas.0, betas.1] {
                if !(0.0..1.0).contains(&beta) {
                    return Err(GanError::InvalidHyperparameter(format!(
                        "{name} must lie in [0, 1), got {beta}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Options for one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOptions {
    /// Number of passes over the batch source
    pub epochs: usize,
    /// Advisory batch size; the true size is read from each yielded batch
    pub batch_size: usize,
    /// Where batches are placed before each step
    pub device: Device,
    /// Hand the fixed-latent preview to the visualizer at each epoch end
    pub visualize: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 128,
            device: Device::fastest(),
            visualize: true,
        }
    }
}

/// Options for one generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Grid rows; rows * cols images are sampled
    pub rows: usize,
    /// Grid columns
    pub cols: usize,
    /// Where the generator input is placed
    pub device: Device,
    /// Hand the result to the visualizer
    pub visualize: bool,
    /// Return the sampled latent vectors alongside the images
    pub return_latents: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            rows: 8,
            cols: 8,
            device: Device::fastest(),
            visualize: true,
            return_latents: true,
        }
    }
}
