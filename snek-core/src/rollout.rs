//! Episode rollout.
//!
//! [`play_episode`] drives an environment through one episode with a
//! stochastic policy and produces the transitions PPO trains on. The
//! policy parameters are read-only here: the roller only needs `&mut` for
//! the policy's action-sampling RNG.
use crate::{error::SnekError, Env, StochasticPolicy};
use anyhow::Result;

/// A single step of an episode, immutable once recorded.
///
/// `act_prob` is the probability the collecting policy assigned to the
/// sampled action; it is never recomputed after collection.
#[derive(Debug, Clone)]
pub struct Transition<O> {
    /// Observation at the time the action was taken.
    pub obs: O,

    /// Index of the taken action in the discrete action set.
    pub act: usize,

    /// Probability of the action under the policy at collection time.
    pub act_prob: f32,

    /// Discounted return of the shaped rewards from this step on.
    pub ret: f32,

    /// Raw environment reward, kept for statistics only.
    pub raw_reward: f32,
}

/// An ordered sequence of transitions from reset to terminal.
#[derive(Debug, Clone)]
pub struct Episode<O> {
    /// Transitions in step order.
    pub transitions: Vec<Transition<O>>,
}

impl<O> Episode<O> {
    /// Number of steps in the episode.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Whether the episode has no steps.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Sum of the raw environment rewards over the episode.
    pub fn raw_return(&self) -> f32 {
        self.transitions.iter().map(|t| t.raw_reward).sum()
    }
}

/// Reward shaping applied per step during rollout.
///
/// The shaped reward feeds the discounted returns; the raw reward is kept
/// alongside for statistics.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum RewardShaping {
    /// Use the raw reward unchanged.
    None,

    /// Add +1 when the distance to the goal decreased since the previous
    /// step, 0 when unchanged, -2 when it increased.
    CloseBonus,

    /// Subtract `coef * (dist - prev_dist)` from the raw reward.
    DiffDistBonus {
        /// Scale of the distance-delta penalty.
        coef: f32,
    },
}

impl RewardShaping {
    /// Parses a shaping mode name, attaching `dist_bonus` as the
    /// coefficient of the distance-delta mode.
    ///
    /// Recognized names are `none`, `close-bonus` and `diff-dist-bonus`.
    /// Anything else is a configuration error, raised here before any
    /// episode is played.
    pub fn parse(mode: &str, dist_bonus: f32) -> Result<Self, SnekError> {
        match mode {
            "none" => Ok(Self::None),
            "close-bonus" => Ok(Self::CloseBonus),
            "diff-dist-bonus" => Ok(Self::DiffDistBonus { coef: dist_bonus }),
            _ => Err(SnekError::UnknownRewardShaping(mode.to_string())),
        }
    }

    /// Shapes a raw reward given the change of distance since the
    /// previous step (`0.0` on the first step of an episode).
    pub fn shape(&self, raw: f32, diff_dist: f32) -> f32 {
        match self {
            Self::None => raw,
            Self::CloseBonus => {
                let bonus = if diff_dist < 0.0 {
                    1.0
                } else if diff_dist == 0.0 {
                    0.0
                } else {
                    -2.0
                };
                raw + bonus
            }
            Self::DiffDistBonus { coef } => raw - coef * diff_dist,
        }
    }
}

/// Plays one episode and returns its transitions.
///
/// Discounted returns of the shaped rewards are accumulated backward in
/// O(L): `g_i = r_i + gamma * g_{i+1}`.
pub fn play_episode<E, P>(
    env: &mut E,
    policy: &mut P,
    shaping: RewardShaping,
    gamma: f32,
) -> Result<Episode<E::Obs>>
where
    E: Env,
    P: StochasticPolicy<E>,
{
    let mut obs = env.reset()?;
    let mut steps = Vec::new();
    let mut prev_dist: Option<f32> = None;

    loop {
        let (act, act_idx, act_prob) = policy.sample_with_prob(&obs)?;
        let (step, _) = env.step(&act);

        let diff_dist = match prev_dist {
            None => 0.0,
            Some(d) => step.distance - d,
        };
        prev_dist = Some(step.distance);
        let shaped = shaping.shape(step.reward, diff_dist);

        steps.push((obs, act_idx, act_prob, shaped, step.reward));
        let done = step.is_done();
        obs = step.obs;
        if done {
            break;
        }
    }

    let mut transitions = Vec::with_capacity(steps.len());
    let mut g = 0f32;
    for (obs, act, act_prob, shaped, raw_reward) in steps.into_iter().rev() {
        g = shaped + gamma * g;
        transitions.push(Transition {
            obs,
            act,
            act_prob,
            ret: g,
            raw_reward,
        });
    }
    transitions.reverse();

    Ok(Episode { transitions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{record::Record, Act, Obs, Policy, Step};

    #[derive(Debug, Clone)]
    struct TestObs(f32);

    impl Obs for TestObs {
        fn dim(&self) -> usize {
            1
        }
    }

    #[derive(Debug, Clone)]
    struct TestAct(usize);

    impl Act for TestAct {}

    impl From<usize> for TestAct {
        fn from(ix: usize) -> Self {
            Self(ix)
        }
    }

    /// Emits fixed reward and distance sequences, done at the last step.
    struct ScriptedEnv {
        rewards: Vec<f32>,
        distances: Vec<f32>,
        t: usize,
    }

    impl ScriptedEnv {
        fn new(rewards: Vec<f32>, distances: Vec<f32>) -> Self {
            assert_eq!(rewards.len(), distances.len());
            Self {
                rewards,
                distances,
                t: 0,
            }
        }
    }

    impl Env for ScriptedEnv {
        type Config = ();
        type Obs = TestObs;
        type Act = TestAct;
        type Info = ();

        fn build(_config: &Self::Config, _seed: u64) -> Result<Self> {
            unimplemented!()
        }

        fn reset(&mut self) -> Result<Self::Obs> {
            self.t = 0;
            Ok(TestObs(0.0))
        }

        fn step(&mut self, a: &Self::Act) -> (Step<Self>, Record) {
            let t = self.t;
            self.t += 1;
            let step = Step::new(
                TestObs(self.t as f32),
                a.clone(),
                self.rewards[t],
                self.distances[t],
                self.t == self.rewards.len(),
                false,
                (),
            );
            (step, Record::empty())
        }
    }

    /// Always picks action 0 with a fixed probability.
    struct FixedPolicy;

    impl Policy<ScriptedEnv> for FixedPolicy {
        fn sample(&mut self, _obs: &TestObs) -> TestAct {
            TestAct(0)
        }
    }

    impl StochasticPolicy<ScriptedEnv> for FixedPolicy {
        fn n_actions(&self) -> usize {
            4
        }

        fn sample_with_prob(&mut self, _obs: &TestObs) -> Result<(TestAct, usize, f32)> {
            Ok((TestAct(0), 0, 0.25))
        }
    }

    fn returns_of(episode: &Episode<TestObs>) -> Vec<f32> {
        episode.transitions.iter().map(|t| t.ret).collect()
    }

    #[test]
    fn discounted_return_matches_direct_sum() -> Result<()> {
        let rewards = vec![1.0, -2.0, 0.5, 3.0, -1.0];
        let gamma = 0.9f32;
        let mut env = ScriptedEnv::new(rewards.clone(), vec![0.0; 5]);
        let episode = play_episode(&mut env, &mut FixedPolicy, RewardShaping::None, gamma)?;

        let direct: f32 = rewards
            .iter()
            .enumerate()
            .map(|(j, r)| gamma.powi(j as i32) * r)
            .sum();
        assert!((episode.transitions[0].ret - direct).abs() < 1e-5);
        assert_eq!(episode.transitions[4].ret, -1.0);
        Ok(())
    }

    #[test]
    fn two_step_episode_gamma_half() -> Result<()> {
        let mut env = ScriptedEnv::new(vec![1.0, 2.0], vec![0.0, 0.0]);
        let episode = play_episode(&mut env, &mut FixedPolicy, RewardShaping::None, 0.5)?;
        assert_eq!(returns_of(&episode), vec![2.0, 2.0]);
        Ok(())
    }

    #[test]
    fn close_bonus_sequence() -> Result<()> {
        // Distances [5, 5, 3, 4] give bonuses [0, 0, +1, -2].
        let mut env = ScriptedEnv::new(vec![0.0; 4], vec![5.0, 5.0, 3.0, 4.0]);
        let episode = play_episode(&mut env, &mut FixedPolicy, RewardShaping::CloseBonus, 0.0)?;
        // With gamma = 0 the return at each step is the shaped reward itself.
        assert_eq!(returns_of(&episode), vec![0.0, 0.0, 1.0, -2.0]);
        Ok(())
    }

    #[test]
    fn diff_dist_bonus_subtracts_scaled_delta() -> Result<()> {
        let raw = vec![1.0, 1.0, 1.0];
        let dists = vec![4.0, 6.0, 3.0];
        let coef = 0.5;
        let mut env = ScriptedEnv::new(raw.clone(), dists.clone());
        let episode = play_episode(
            &mut env,
            &mut FixedPolicy,
            RewardShaping::DiffDistBonus { coef },
            0.0,
        )?;
        // Deltas are [0, +2, -3]; shaped rewards raw - coef * delta.
        assert_eq!(returns_of(&episode), vec![1.0, 0.0, 2.5]);
        Ok(())
    }

    #[test]
    fn transitions_keep_collection_time_probs_and_raw_rewards() -> Result<()> {
        let mut env = ScriptedEnv::new(vec![1.0, 2.0], vec![3.0, 2.0]);
        let episode = play_episode(&mut env, &mut FixedPolicy, RewardShaping::CloseBonus, 0.9)?;
        for t in &episode.transitions {
            assert_eq!(t.act_prob, 0.25);
        }
        assert_eq!(episode.transitions[0].raw_reward, 1.0);
        assert_eq!(episode.transitions[1].raw_reward, 2.0);
        assert_eq!(episode.raw_return(), 3.0);
        Ok(())
    }

    #[test]
    fn unknown_shaping_mode_is_a_config_error() {
        let err = RewardShaping::parse("bogus", 0.2).unwrap_err();
        assert!(matches!(err, SnekError::UnknownRewardShaping(_)));
        assert_eq!(
            RewardShaping::parse("close-bonus", 0.2).unwrap(),
            RewardShaping::CloseBonus
        );
        assert_eq!(
            RewardShaping::parse("diff-dist-bonus", 0.2).unwrap(),
            RewardShaping::DiffDistBonus { coef: 0.2 }
        );
    }
}
