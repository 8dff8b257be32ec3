//! Multilayer perceptron with an actor and a critic head.
mod base;
mod config;
use crate::Activation;
pub use base::ActorCriticMlp;
use candle_core::Tensor;
use candle_nn::{Linear, Module};
pub use config::MlpConfig;

fn mlp_forward(xs: Tensor, layers: &[Linear], activation: &Activation) -> Tensor {
    let mut xs = xs;
    for layer in layers {
        xs = activation.forward(&layer.forward(&xs).unwrap());
    }
    xs
}
