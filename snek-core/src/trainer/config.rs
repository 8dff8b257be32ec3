//! Configuration of [`Trainer`](super::Trainer).
use crate::rollout::RewardShaping;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Trainer`](super::Trainer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// The number of training iterations (collect batch, then update).
    pub n_iterations: usize,

    /// The number of episodes collected per batch.
    pub episodes_per_batch: usize,

    /// Discount factor for the returns.
    pub gamma: f32,

    /// Reward shaping applied during rollout.
    pub reward_shaping: RewardShaping,

    /// Random seed for building the environment.
    pub seed: u64,

    /// Where to save the best model parameters.
    pub model_dir: Option<String>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_iterations: 500,
            episodes_per_batch: 32,
            gamma: 0.99,
            reward_shaping: RewardShaping::None,
            seed: 42,
            model_dir: None,
        }
    }
}

impl TrainerConfig {
    /// Sets the number of training iterations.
    pub fn n_iterations(mut self, v: usize) -> Self {
        self.n_iterations = v;
        self
    }

    /// Sets the number of episodes collected per batch.
    pub fn episodes_per_batch(mut self, v: usize) -> Self {
        self.episodes_per_batch = v;
        self
    }

    /// Sets the discount factor.
    pub fn gamma(mut self, v: f32) -> Self {
        self.gamma = v;
        self
    }

    /// Sets the reward shaping mode.
    pub fn reward_shaping(mut self, v: RewardShaping) -> Self {
        self.reward_shaping = v;
        self
    }

    /// Sets the environment seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Sets the directory where the best model parameters are saved.
    pub fn model_dir(mut self, v: impl Into<String>) -> Self {
        self.model_dir = Some(v.into());
        self
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
