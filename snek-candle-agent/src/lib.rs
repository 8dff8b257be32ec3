//! PPO agent implemented with [candle](https://crates.io/crates/candle-core).
pub mod mlp;
pub mod model;
pub mod opt;
pub mod ppo;
pub mod util;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl From<Device> for candle_core::Device {
    fn from(device: Device) -> Self {
        match device {
            Device::Cpu => Self::Cpu,
            Device::Cuda(n) => Self::new_cuda(n).unwrap(),
        }
    }
}

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Activation function applied between the layers of an MLP.
pub enum Activation {
    /// No activation.
    None,

    /// Rectified linear unit.
    ReLU,

    /// Logistic sigmoid.
    Sigmoid,
}

impl Activation {
    /// Applies the activation function.
    pub fn forward(&self, xs: &candle_core::Tensor) -> candle_core::Tensor {
        match self {
            Self::None => xs.clone(),
            Self::ReLU => xs.relu().unwrap(),
            Self::Sigmoid => candle_nn::ops::sigmoid(xs).unwrap(),
        }
    }
}
