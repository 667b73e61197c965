//! Optimizers for the two adversarial networks

mod adamw;
mod optimizer;

pub use adamw::AdamW;
pub use optimizer::Optimizer;
