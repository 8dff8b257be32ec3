//! Agent.
use super::{Env, StochasticPolicy};
use crate::{dataset::TrainingSet, record::Record};
use anyhow::Result;
use std::path::Path;

/// Represents a trainable policy on an environment.
///
/// Unlike off-policy agents that pull batches from a replay buffer, the
/// agent here is on-policy: each optimization step consumes a
/// [`TrainingSet`] built from episodes collected under the agent's current
/// parameters, and the parameters are mutated only inside [`Agent::opt`].
pub trait Agent<E: Env>: StochasticPolicy<E> {
    /// Set the policy to training mode.
    fn train(&mut self);

    /// Set the policy to evaluation mode.
    fn eval(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Performs an optimization step over the given training set and
    /// returns diagnostics of the update.
    fn opt(&mut self, dataset: &TrainingSet<E::Obs>) -> Result<Record>;

    /// Save the parameters of the agent in the given directory.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Load the parameters of the agent from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
