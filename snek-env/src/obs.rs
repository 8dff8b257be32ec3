//! Observation of the snake environment.
use snek_core::Obs;

/// The simplest numeric summary of the board, a vector of 6 components:
/// head position (y, x), fruit position (y, x), current direction index
/// and the Manhattan distance from head to fruit.
#[derive(Debug, Clone)]
pub struct SnekObs(pub Vec<f32>);

impl Obs for SnekObs {
    fn dim(&self) -> usize {
        self.0.len()
    }
}

impl AsRef<[f32]> for SnekObs {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
