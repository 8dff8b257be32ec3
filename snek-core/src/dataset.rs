//! Batch aggregation.
//!
//! Merges the episodes of one batch into a flattened training set with
//! returns standardized over the whole batch. All episodes of a batch must
//! have been collected under the same policy snapshot; the aggregation
//! itself does not and cannot check this, the trainer guarantees it by
//! never updating parameters mid-batch.
use crate::{error::SnekError, rollout::Episode};

/// Epsilon guarding zero-variance batches in return normalization.
const NORM_EPS: f32 = 1e-8;

/// Flattened transitions of one batch, ready for the update engine.
///
/// Returns are standardized to zero mean and unit variance over the entire
/// batch. Raw rewards are dropped here; they only feed [`BatchStats`].
#[derive(Debug, Clone)]
pub struct TrainingSet<O> {
    /// Observations, one per transition.
    pub obs: Vec<O>,

    /// Action indices.
    pub acts: Vec<usize>,

    /// Action probabilities under the collecting policy.
    pub old_probs: Vec<f32>,

    /// Normalized discounted returns.
    pub returns: Vec<f32>,
}

impl<O: Clone> TrainingSet<O> {
    /// Builds a training set from the episodes of one batch.
    ///
    /// # Errors
    ///
    /// Fails with [`SnekError::EmptyBatch`] if the batch contains no
    /// transitions.
    pub fn build(episodes: &[Episode<O>]) -> Result<Self, SnekError> {
        let n: usize = episodes.iter().map(|e| e.len()).sum();
        if n == 0 {
            return Err(SnekError::EmptyBatch);
        }

        let mut obs = Vec::with_capacity(n);
        let mut acts = Vec::with_capacity(n);
        let mut old_probs = Vec::with_capacity(n);
        let mut returns = Vec::with_capacity(n);
        for episode in episodes {
            for t in &episode.transitions {
                obs.push(t.obs.clone());
                acts.push(t.act);
                old_probs.push(t.act_prob);
                returns.push(t.ret);
            }
        }

        let mean = returns.iter().sum::<f32>() / n as f32;
        let std = (returns.iter().map(|g| (g - mean).powi(2)).sum::<f32>() / n as f32).sqrt();
        for g in returns.iter_mut() {
            *g = (*g - mean) / (std + NORM_EPS);
        }

        Ok(Self {
            obs,
            acts,
            old_probs,
            returns,
        })
    }
}

impl<O> TrainingSet<O> {
    /// Number of transitions in the set.
    pub fn len(&self) -> usize {
        self.obs.len()
    }

    /// Whether the set has no transitions.
    pub fn is_empty(&self) -> bool {
        self.obs.is_empty()
    }
}

/// Per-batch statistics of the true environment rewards, for monitoring.
#[derive(Debug, Clone, Copy)]
pub struct BatchStats {
    /// Mean raw episode return over the batch.
    pub mean_reward: f32,

    /// Mean episode length over the batch.
    pub mean_length: f32,
}

impl BatchStats {
    /// Computes the statistics of a batch of episodes.
    pub fn new<O>(episodes: &[Episode<O>]) -> Self {
        let n = episodes.len().max(1) as f32;
        let mean_reward = episodes.iter().map(|e| e.raw_return()).sum::<f32>() / n;
        let mean_length = episodes.iter().map(|e| e.len() as f32).sum::<f32>() / n;
        Self {
            mean_reward,
            mean_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rollout::Transition;

    fn episode(rets: &[f32]) -> Episode<f32> {
        Episode {
            transitions: rets
                .iter()
                .map(|&g| Transition {
                    obs: 0.0,
                    act: 0,
                    act_prob: 0.25,
                    ret: g,
                    raw_reward: g,
                })
                .collect(),
        }
    }

    #[test]
    fn normalizes_returns_over_the_whole_batch() {
        let episodes = vec![episode(&[1.0, 2.0, 3.0]), episode(&[4.0, 5.0])];
        let set = TrainingSet::build(&episodes).unwrap();

        assert_eq!(set.len(), 5);
        let mean = set.returns.iter().sum::<f32>() / 5.0;
        let var = set.returns.iter().map(|g| (g - mean).powi(2)).sum::<f32>() / 5.0;
        assert!(mean.abs() < 1e-5);
        assert!((var.sqrt() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn singleton_batch_stays_finite() {
        let episodes = vec![episode(&[7.0])];
        let set = TrainingSet::build(&episodes).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.returns[0].is_finite());
        assert_eq!(set.returns[0], 0.0);
    }

    #[test]
    fn zero_variance_batch_stays_finite() {
        let episodes = vec![episode(&[2.0, 2.0, 2.0])];
        let set = TrainingSet::build(&episodes).unwrap();
        assert!(set.returns.iter().all(|g| g.is_finite()));
    }

    #[test]
    fn empty_batch_is_an_error() {
        let episodes: Vec<Episode<f32>> = vec![];
        assert!(matches!(
            TrainingSet::build(&episodes),
            Err(SnekError::EmptyBatch)
        ));
    }

    #[test]
    fn batch_stats_use_raw_rewards() {
        let episodes = vec![episode(&[1.0, 1.0]), episode(&[3.0])];
        let stats = BatchStats::new(&episodes);
        assert_eq!(stats.mean_reward, 2.5);
        assert_eq!(stats.mean_length, 1.5);
    }
}
