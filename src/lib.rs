//! Adversarial training for generative image models.
//!
//! The crate trains a generator/discriminator pair with the classic
//! smoothed-label GAN objective:
//!
//! ```text
//! Latent z ~ N(0, I) ──► Generator ──► fake images ──┬─► Discriminator ─► real / fake
//!                                                    │
//!                        real image batches ─────────┘
//! ```
//!
//! Gradient flow is controlled explicitly: fake images are detached from the
//! generator while the discriminator is updated, and the same fake batch is
//! re-classified with full tracking for the generator update.
//!
//! # Example
//!
//! ```no_run
//! use adversario::gan::{Gan, GanConfig, TrainOptions};
//! use adversario::data::InMemoryLoader;
//!
//! # fn networks() -> (adversario::nn::Sequential, adversario::nn::Sequential) { todo!() }
//! # fn batches() -> InMemoryLoader { todo!() }
//! let (generator, discriminator) = networks();
//! let mut gan = Gan::new(GanConfig::default(), generator, discriminator)?;
//! gan.train(&batches(), &TrainOptions::default(), None)?;
//! # Ok::<(), adversario::GanError>(())
//! ```

pub mod autograd;
pub mod data;
pub mod device;
pub mod error;
pub mod gan;
pub mod latent;
pub mod loss;
pub mod nn;
pub mod optim;
pub mod viz;

pub use autograd::Tensor;
pub use data::{DataLoader, ImageBatch, InMemoryLoader};
pub use device::Device;
pub use error::{GanError, Result};
pub use gan::{Gan, GanConfig, GenerateOptions, Generated, TrainOptions};
pub use latent::LatentBatch;
