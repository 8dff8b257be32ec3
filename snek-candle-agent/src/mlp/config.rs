use crate::{util::OutDim, Activation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`ActorCriticMlp`](super::ActorCriticMlp).
pub struct MlpConfig {
    pub(super) in_dim: i64,
    pub(super) units: Vec<i64>,
    pub(super) out_dim: i64,
    pub(super) activation: Activation,
}

impl MlpConfig {
    /// Creates configuration of the actor-critic MLP.
    ///
    /// * `activation` - Activation function applied after each trunk layer.
    pub fn new(in_dim: i64, units: Vec<i64>, out_dim: i64, activation: Activation) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            activation,
        }
    }
}

impl OutDim for MlpConfig {
    fn get_out_dim(&self) -> i64 {
        self.out_dim
    }

    fn set_out_dim(&mut self, out_dim: i64) {
        self.out_dim = out_dim;
    }
}
