use super::{mlp_forward, MlpConfig};
use crate::model::SubModel1;
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};

/// Returns vector of linear modules from [`MlpConfig`].
fn create_linear_layers(prefix: &str, vs: VarBuilder, config: &MlpConfig) -> Result<Vec<Linear>> {
    let mut in_out_pairs: Vec<(i64, i64)> = (0..config.units.len() - 1)
        .map(|i| (config.units[i], config.units[i + 1]))
        .collect();
    in_out_pairs.insert(0, (config.in_dim, config.units[0]));
    let vs = vs.pp(prefix);

    Ok(in_out_pairs
        .iter()
        .enumerate()
        .map(|(i, &(in_dim, out_dim))| {
            linear(in_dim as _, out_dim as _, vs.pp(format!("ln{}", i))).unwrap()
        })
        .collect())
}

/// Multilayer perceptron with a shared trunk and two linear heads.
///
/// The first head emits action logits, the second a scalar state value.
pub struct ActorCriticMlp {
    config: MlpConfig,
    device: Device,
    actor: Linear,
    critic: Linear,
    layers: Vec<Linear>,
}

impl SubModel1 for ActorCriticMlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = (Tensor, Tensor);

    fn forward(&self, xs: &Self::Input) -> Self::Output {
        let xs = xs.to_device(&self.device).unwrap();
        let xs = mlp_forward(xs, &self.layers, &self.config.activation);
        let logits = self.actor.forward(&xs).unwrap();
        let value = self.critic.forward(&xs).unwrap();
        (logits, value)
    }

    fn build(vs: VarBuilder, config: Self::Config) -> Self {
        let device = vs.device().clone();
        let layers = create_linear_layers("trunk", vs.clone(), &config).unwrap();
        let (actor, critic) = {
            let in_dim = *config.units.last().unwrap();
            let out_dim = config.out_dim;
            let actor = linear(in_dim as _, out_dim as _, vs.pp("actor")).unwrap();
            let critic = linear(in_dim as _, 1, vs.pp("critic")).unwrap();
            (actor, critic)
        };

        Self {
            config,
            device,
            actor,
            critic,
            layers,
        }
    }
}
