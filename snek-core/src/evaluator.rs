//! Evaluation of a trained policy.
use crate::{record::Record, Env, Policy};
use anyhow::Result;

/// Runs a fixed number of episodes and reports the mean episode return.
pub struct Evaluator<E: Env> {
    /// The number of episodes to run during evaluation.
    n_episodes: usize,

    /// The environment instance used for evaluation.
    env: E,
}

impl<E: Env> Evaluator<E> {
    /// Constructs an [`Evaluator`].
    pub fn new(config: &E::Config, seed: u64, n_episodes: usize) -> Result<Self> {
        Ok(Self {
            n_episodes,
            env: E::build(config, seed)?,
        })
    }

    /// Evaluates the policy, returning a record with the mean episode
    /// return over all evaluation episodes.
    pub fn evaluate<P: Policy<E>>(&mut self, policy: &mut P) -> Result<Record> {
        let mut r_total = 0f32;

        for _ in 0..self.n_episodes {
            let mut prev_obs = self.env.reset()?;

            loop {
                let act = policy.sample(&prev_obs);
                let (step, _) = self.env.step(&act);
                r_total += step.reward;
                if step.is_done() {
                    break;
                }
                prev_obs = step.obs;
            }
        }

        Ok(Record::from_scalar(
            "eval_reward",
            r_total / self.n_episodes as f32,
        ))
    }
}
