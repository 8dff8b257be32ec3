use super::PpoModelConfig;
use crate::{
    model::SubModel1,
    util::OutDim,
    Device,
};
use anyhow::Result;
use candle_core::Tensor;
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    marker::PhantomData,
    path::Path,
};

/// Configuration of [`Ppo`](super::Ppo) agent.
#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct PpoConfig<P>
where
    P: SubModel1<Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
{
    pub model_config: PpoModelConfig<P::Config>,
    pub n_epochs: usize,
    pub batch_size: usize,
    pub clip_eps: f64,
    pub target_kl: f64,
    pub use_entropy: bool,
    pub beta: f64,
    pub seed: u64,
    pub train: bool,
    pub device: Option<Device>,
    phantom: PhantomData<P>,
}

impl<P> Clone for PpoConfig<P>
where
    P: SubModel1<Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
{
    fn clone(&self) -> Self {
        Self {
            model_config: self.model_config.clone(),
            n_epochs: self.n_epochs,
            batch_size: self.batch_size,
            clip_eps: self.clip_eps,
            target_kl: self.target_kl,
            use_entropy: self.use_entropy,
            beta: self.beta,
            seed: self.seed,
            train: self.train,
            device: self.device.clone(),
            phantom: PhantomData,
        }
    }
}

impl<P> Default for PpoConfig<P>
where
    P: SubModel1<Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
{
    fn default() -> Self {
        Self {
            model_config: PpoModelConfig::default(),
            n_epochs: 3,
            batch_size: 64,
            clip_eps: 0.2,
            target_kl: 0.01,
            use_entropy: false,
            beta: 0.02,
            seed: 42,
            train: false,
            device: None,
            phantom: PhantomData,
        }
    }
}

impl<P> PpoConfig<P>
where
    P: SubModel1<Output = (Tensor, Tensor)>,
    P::Config: DeserializeOwned + Serialize + OutDim + std::fmt::Debug + PartialEq + Clone,
{
    /// Sets the numbers of optimization epochs per update.
    pub fn n_epochs(mut self, v: usize) -> Self {
        self.n_epochs = v;
        self
    }

    /// Sets the minibatch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Sets the clipping range of the importance ratio.
    pub fn clip_eps(mut self, v: f64) -> Self {
        self.clip_eps = v;
        self
    }

    /// Sets the KL divergence threshold for early stopping.
    pub fn target_kl(mut self, v: f64) -> Self {
        self.target_kl = v;
        self
    }

    /// Enables or disables the entropy bonus in the actor loss.
    pub fn use_entropy(mut self, v: bool) -> Self {
        self.use_entropy = v;
        self
    }

    /// Sets the coefficient of the entropy bonus.
    pub fn beta(mut self, v: f64) -> Self {
        self.beta = v;
        self
    }

    /// Sets the seed of the action sampler.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets the configuration of the actor-critic model.
    pub fn model_config(mut self, model_config: PpoModelConfig<P::Config>) -> Self {
        self.model_config = model_config;
        self
    }

    /// Sets the device.
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Constructs [`PpoConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of PPO agent from {}", path_.to_str().unwrap());
        Ok(b)
    }

    /// Saves [`PpoConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of PPO agent into {}", path_.to_str().unwrap());
        Ok(())
    }
}
