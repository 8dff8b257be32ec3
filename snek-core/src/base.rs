//! Core functionalities.
mod agent;
mod env;
mod policy;
mod step;
pub use agent::Agent;
pub use env::Env;
pub use policy::{Configurable, Policy, StochasticPolicy};
pub use step::{Info, Step};
use std::fmt::Debug;

/// An observation of an environment.
pub trait Obs: Clone + Debug {
    /// Returns the number of components in the observation.
    fn dim(&self) -> usize;
}

/// An action on the environment.
pub trait Act: Clone + Debug {}
