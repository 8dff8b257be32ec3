#![warn(missing_docs)]
//! Core abstractions for training a PPO agent on an episodic environment.
//!
//! This crate is backend-agnostic: it defines the environment and policy
//! traits, the episode rollout and batch aggregation logic, the training
//! loop, and the record/recorder machinery for metrics. Function
//! approximators and the PPO optimization itself live in backend crates
//! (see `snek-candle-agent`).
pub mod error;
pub mod record;

mod base;
pub use base::{Act, Agent, Configurable, Env, Info, Obs, Policy, Step, StochasticPolicy};

mod rollout;
pub use rollout::{play_episode, Episode, RewardShaping, Transition};

mod dataset;
pub use dataset::{BatchStats, TrainingSet};

mod trainer;
pub use trainer::{Trainer, TrainerConfig};

mod evaluator;
pub use evaluator::Evaluator;
