//! Configuration of the snake environment.
use serde::{Deserialize, Serialize};

/// Configuration of [`SnekEnv`](crate::SnekEnv).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SnekEnvConfig {
    /// Number of columns of the grid.
    pub width: i64,

    /// Number of rows of the grid.
    pub height: i64,

    /// Steps allowed without eating a fruit before the episode is
    /// truncated.
    pub hunger: usize,

    /// If `true`, leaving the grid kills the snake; otherwise the grid
    /// wraps around.
    pub walls: bool,

    /// Reward for eating a fruit.
    pub fruit_reward: f32,

    /// Reward for dying.
    pub death_reward: f32,
}

impl Default for SnekEnvConfig {
    fn default() -> Self {
        Self {
            width: 12,
            height: 12,
            hunger: 15,
            walls: true,
            fruit_reward: 1.0,
            death_reward: -1.0,
        }
    }
}

impl SnekEnvConfig {
    /// Sets the grid size.
    pub fn size(mut self, width: i64, height: i64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the hunger step limit.
    pub fn hunger(mut self, v: usize) -> Self {
        self.hunger = v;
        self
    }

    /// Enables or disables walls.
    pub fn walls(mut self, v: bool) -> Self {
        self.walls = v;
        self
    }
}
