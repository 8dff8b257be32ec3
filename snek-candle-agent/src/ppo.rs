//! PPO agent implemented with [candle](https://crates.io/crates/candle-core).
mod base;
mod config;
mod model;
pub use base::Ppo;
pub use config::PpoConfig;
pub use model::{PpoModel, PpoModelConfig};
