#![warn(missing_docs)]
//! A snake environment on a rectangular grid.
//!
//! The snake moves one cell per step in one of four directions, eating
//! fruits that respawn at random free cells. An episode terminates when
//! the snake collides with a wall (if walls are enabled) or with its own
//! body, and is truncated when a "hunger" step limit passes without a
//! fruit. Observations are the simplest numeric summary of the board:
//! head position, fruit position, current direction and the Manhattan
//! distance from head to fruit.
mod act;
mod base;
mod config;
mod obs;

pub use act::SnekAct;
pub use base::SnekEnv;
pub use config::SnekEnvConfig;
pub use obs::SnekObs;
