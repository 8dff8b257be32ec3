//! Train an [`Agent`].
mod config;
use std::time::SystemTime;

use crate::{
    dataset::{BatchStats, TrainingSet},
    record::{Record, RecordValue::Scalar, Recorder},
    rollout::{play_episode, Episode, RewardShaping},
    Agent, Env,
};
use anyhow::Result;
pub use config::TrainerConfig;
use log::info;

/// Manages the training loop and related objects.
///
/// Each iteration collects a fixed number of episodes under the agent's
/// current (frozen) parameters, builds a training set from them, and runs
/// one optimization call. Parameters are mutated only inside
/// [`Agent::opt`], and the next batch is not collected before that call
/// returns, so every transition of a batch was produced by one policy
/// snapshot.
///
/// The trainer tracks the best mean reward and mean episode length seen so
/// far and saves the agent's parameters into `(model_dir)/best` whenever
/// either improves.
pub struct Trainer<E: Env> {
    /// Configuration of the environment.
    env_config: E::Config,

    /// The number of training iterations.
    n_iterations: usize,

    /// The number of episodes collected per batch.
    episodes_per_batch: usize,

    /// Discount factor.
    gamma: f32,

    /// Reward shaping applied during rollout.
    reward_shaping: RewardShaping,

    /// Seed for building the environment.
    seed: u64,

    /// Where to save the best model parameters.
    model_dir: Option<String>,

    /// Best mean reward seen so far.
    best_reward: f32,

    /// Best mean episode length seen so far.
    best_length: f32,
}

impl<E: Env> Trainer<E> {
    /// Constructs a trainer.
    pub fn build(config: TrainerConfig, env_config: E::Config) -> Self {
        Self {
            env_config,
            n_iterations: config.n_iterations,
            episodes_per_batch: config.episodes_per_batch,
            gamma: config.gamma,
            reward_shaping: config.reward_shaping,
            seed: config.seed,
            model_dir: config.model_dir,
            best_reward: f32::MIN,
            best_length: f32::MIN,
        }
    }

    fn save_best_model<A: Agent<E>>(agent: &A, model_dir: &str) {
        let model_dir = format!("{}/best", model_dir);
        match agent.save_params(model_dir.as_ref()) {
            Ok(()) => info!("Saved the model in {:?}.", &model_dir),
            Err(_) => info!("Failed to save model in {:?}.", &model_dir),
        }
    }

    /// Collects one batch of episodes under the agent's current parameters.
    fn collect_batch<A: Agent<E>>(
        &self,
        env: &mut E,
        agent: &mut A,
    ) -> Result<Vec<Episode<E::Obs>>> {
        (0..self.episodes_per_batch)
            .map(|_| play_episode(env, agent, self.reward_shaping, self.gamma))
            .collect()
    }

    /// Trains the agent.
    pub fn train<A>(&mut self, agent: &mut A, recorder: &mut dyn Recorder) -> Result<()>
    where
        A: Agent<E>,
    {
        let mut env = E::build(&self.env_config, self.seed)?;
        agent.train();
        let start = SystemTime::now();

        for iteration in 1..=self.n_iterations {
            let episodes = self.collect_batch(&mut env, agent)?;
            let stats = BatchStats::new(&episodes);
            let dataset = TrainingSet::build(&episodes)?;
            let mut record = agent.opt(&dataset)?;

            if stats.mean_reward > self.best_reward {
                info!("New best mean reward: {:.3}", stats.mean_reward);
                self.best_reward = stats.mean_reward;
                if let Some(model_dir) = &self.model_dir {
                    Self::save_best_model(agent, model_dir);
                }
            }
            if stats.mean_length > self.best_length {
                info!("New best mean episode length: {:.3}", stats.mean_length);
                self.best_length = stats.mean_length;
                if let Some(model_dir) = &self.model_dir {
                    Self::save_best_model(agent, model_dir);
                }
            }

            record.insert("mean_reward", Scalar(stats.mean_reward));
            record.insert("mean_length", Scalar(stats.mean_length));
            record.insert(
                "elapsed_sec",
                Scalar(start.elapsed()?.as_secs_f64() as f32),
            );
            info!(
                "iteration: {}, reward: {:.3}, length: {:.3}",
                iteration, stats.mean_reward, stats.mean_length
            );
            recorder.write(iteration, record);
        }

        recorder.flush()?;
        Ok(())
    }

    /// Best mean reward seen during training.
    pub fn best_reward(&self) -> f32 {
        self.best_reward
    }

    /// Best mean episode length seen during training.
    pub fn best_length(&self) -> f32 {
        self.best_length
    }
}
