//! Environment step.
use super::Env;

/// Additional information to `Obs` and `Act`.
pub trait Info {}

impl Info for () {}

/// Represents an action, observation and reward tuple `(a_t, o_t+1, r_t)`
/// with some additional information.
///
/// An environment emits a [`Step`] object at every interaction step.
/// Besides the raw reward, the step carries the current distance to the
/// goal, which reward shaping uses as a secondary signal.
pub struct Step<E: Env> {
    /// Action.
    pub act: E::Act,

    /// Observation after the action.
    pub obs: E::Obs,

    /// Raw reward emitted by the environment.
    pub reward: f32,

    /// Distance to the goal after the action.
    pub distance: f32,

    /// Flag denoting if the episode is terminated.
    pub is_terminated: bool,

    /// Flag denoting if the episode is truncated.
    pub is_truncated: bool,

    /// Information defined by user.
    pub info: E::Info,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: E::Obs,
        act: E::Act,
        reward: f32,
        distance: f32,
        is_terminated: bool,
        is_truncated: bool,
        info: E::Info,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            distance,
            is_terminated,
            is_truncated,
            info,
        }
    }

    #[inline]
    /// Terminated or truncated.
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }
}
