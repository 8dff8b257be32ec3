//! Interface of neural networks used in RL agents.
use candle_nn::VarBuilder;

/// Neural network model not owning its [`VarMap`] internally.
///
/// The variables of the model are owned by the wrapper that builds it (see
/// [`PpoModel`](crate::ppo::PpoModel)); the model itself only holds the
/// modules created from the given [`VarBuilder`]. This is the seam through
/// which network topologies can be swapped without touching the update
/// engine.
///
/// [`VarMap`]: candle_nn::VarMap
pub trait SubModel1 {
    /// Configuration from which [`SubModel1`] is constructed.
    type Config;

    /// Input of the [`SubModel1`].
    type Input;

    /// Output of the [`SubModel1`].
    type Output;

    /// Builds [`SubModel1`] with [`VarBuilder`] and [`SubModel1::Config`].
    fn build(vb: VarBuilder, config: Self::Config) -> Self;

    /// A generalized forward function.
    fn forward(&self, input: &Self::Input) -> Self::Output;
}
