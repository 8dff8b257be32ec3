//! Action of the snake environment.
use snek_core::Act;

/// One of the four movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnekAct {
    /// Decreasing row index.
    Up,

    /// Increasing column index.
    Right,

    /// Increasing row index.
    Down,

    /// Decreasing column index.
    Left,
}

impl Act for SnekAct {}

impl SnekAct {
    /// Index of the action in the discrete action set.
    pub fn index(&self) -> usize {
        match self {
            Self::Up => 0,
            Self::Right => 1,
            Self::Down => 2,
            Self::Left => 3,
        }
    }

    /// Movement delta `(dx, dy)` of the action.
    pub(crate) fn delta(&self) -> (i64, i64) {
        match self {
            Self::Up => (0, -1),
            Self::Right => (1, 0),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
        }
    }
}

impl From<usize> for SnekAct {
    /// Indices are taken modulo the action set size.
    fn from(ix: usize) -> Self {
        match ix % 4 {
            0 => Self::Up,
            1 => Self::Right,
            2 => Self::Down,
            _ => Self::Left,
        }
    }
}
