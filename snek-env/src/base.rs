//! Snake environment.
use crate::{SnekAct, SnekEnvConfig, SnekObs};
use anyhow::Result;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use snek_core::{record::Record, Env, Step};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pos {
    x: i64,
    y: i64,
}

impl Pos {
    fn manhattan(&self, other: &Pos) -> f32 {
        ((self.x - other.x).abs() + (self.y - other.y).abs()) as f32
    }
}

/// A snake on a rectangular grid.
///
/// The snake starts as a single cell at the center of the grid and grows
/// by one cell per fruit eaten. Fruits respawn at a random free cell.
pub struct SnekEnv {
    config: SnekEnvConfig,
    rng: SmallRng,
    body: VecDeque<Pos>,
    dir: SnekAct,
    fruit: Pos,
    steps_since_fruit: usize,
}

impl SnekEnv {
    fn spawn_fruit(&mut self) -> Pos {
        loop {
            let p = Pos {
                x: self.rng.gen_range(0..self.config.width),
                y: self.rng.gen_range(0..self.config.height),
            };
            if !self.body.contains(&p) {
                return p;
            }
        }
    }

    fn head(&self) -> Pos {
        *self.body.front().unwrap()
    }

    fn observation(&self) -> SnekObs {
        let head = self.head();
        SnekObs(vec![
            head.y as f32,
            head.x as f32,
            self.fruit.y as f32,
            self.fruit.x as f32,
            self.dir.index() as f32,
            head.manhattan(&self.fruit),
        ])
    }

    fn grid_cells(&self) -> usize {
        (self.config.width * self.config.height) as usize
    }
}

impl Env for SnekEnv {
    type Config = SnekEnvConfig;
    type Obs = SnekObs;
    type Act = SnekAct;
    type Info = ();

    fn build(config: &Self::Config, seed: u64) -> Result<Self> {
        let mut env = Self {
            config: config.clone(),
            rng: SmallRng::seed_from_u64(seed),
            body: VecDeque::new(),
            dir: SnekAct::Right,
            fruit: Pos { x: 0, y: 0 },
            steps_since_fruit: 0,
        };
        let _ = env.reset()?;
        Ok(env)
    }

    fn reset(&mut self) -> Result<Self::Obs> {
        self.body.clear();
        self.body.push_front(Pos {
            x: self.config.width / 2,
            y: self.config.height / 2,
        });
        self.dir = SnekAct::Right;
        self.steps_since_fruit = 0;
        self.fruit = self.spawn_fruit();
        Ok(self.observation())
    }

    fn step(&mut self, a: &Self::Act) -> (Step<Self>, Record) {
        self.dir = *a;
        let (dx, dy) = a.delta();
        let head = self.head();
        let mut new_head = Pos {
            x: head.x + dx,
            y: head.y + dy,
        };

        let out_of_bounds = new_head.x < 0
            || new_head.x >= self.config.width
            || new_head.y < 0
            || new_head.y >= self.config.height;
        if out_of_bounds {
            if self.config.walls {
                let step = Step::new(
                    self.observation(),
                    *a,
                    self.config.death_reward,
                    head.manhattan(&self.fruit),
                    true,
                    false,
                    (),
                );
                return (step, Record::empty());
            }
            new_head.x = new_head.x.rem_euclid(self.config.width);
            new_head.y = new_head.y.rem_euclid(self.config.height);
        }

        let eats = new_head == self.fruit;
        if !eats {
            self.body.pop_back();
        }
        if self.body.contains(&new_head) {
            let step = Step::new(
                self.observation(),
                *a,
                self.config.death_reward,
                new_head.manhattan(&self.fruit),
                true,
                false,
                (),
            );
            return (step, Record::empty());
        }
        self.body.push_front(new_head);

        let reward = if eats {
            self.steps_since_fruit = 0;
            if self.body.len() < self.grid_cells() {
                self.fruit = self.spawn_fruit();
            }
            self.config.fruit_reward
        } else {
            self.steps_since_fruit += 1;
            0.0
        };

        // The snake filling the whole grid counts as a terminal state.
        let is_terminated = self.body.len() == self.grid_cells();
        let is_truncated = !is_terminated && self.steps_since_fruit >= self.config.hunger;
        let step = Step::new(
            self.observation(),
            *a,
            reward,
            new_head.manhattan(&self.fruit),
            is_terminated,
            is_truncated,
            (),
        );
        (step, Record::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snek_core::Obs;

    fn env_with_fruit(fruit: Pos) -> SnekEnv {
        let config = SnekEnvConfig::default();
        let mut env = SnekEnv::build(&config, 7).unwrap();
        env.fruit = fruit;
        env
    }

    #[test]
    fn observation_layout() {
        let config = SnekEnvConfig::default();
        let mut env = SnekEnv::build(&config, 0).unwrap();
        let obs = env.reset().unwrap();
        assert_eq!(obs.dim(), 6);

        let head = env.head();
        let v = obs.as_ref();
        assert_eq!(v[0], head.y as f32);
        assert_eq!(v[1], head.x as f32);
        assert_eq!(v[2], env.fruit.y as f32);
        assert_eq!(v[3], env.fruit.x as f32);
        assert_eq!(v[4], SnekAct::Right.index() as f32);
        assert_eq!(v[5], head.manhattan(&env.fruit));
    }

    #[test]
    fn moving_toward_fruit_decreases_distance() {
        // Head starts at (6, 6) on the default 12x12 grid.
        let mut env = env_with_fruit(Pos { x: 9, y: 6 });
        let d0 = env.head().manhattan(&env.fruit);
        let (step, _) = env.step(&SnekAct::Right);
        assert!(!step.is_done());
        assert_eq!(step.distance, d0 - 1.0);
    }

    #[test]
    fn eating_fruit_rewards_grows_and_resets_hunger() {
        let mut env = env_with_fruit(Pos { x: 7, y: 6 });
        env.steps_since_fruit = 10;
        let (step, _) = env.step(&SnekAct::Right);
        assert_eq!(step.reward, 1.0);
        assert!(!step.is_done());
        assert_eq!(env.body.len(), 2);
        assert_eq!(env.steps_since_fruit, 0);
        // The fruit respawned on a free cell.
        assert!(!env.body.contains(&env.fruit));
    }

    #[test]
    fn wall_collision_terminates_with_death_reward() {
        let config = SnekEnvConfig::default();
        let mut env = SnekEnv::build(&config, 3).unwrap();
        env.fruit = Pos { x: 0, y: 0 };

        let mut terminated = false;
        for _ in 0..12 {
            let (step, _) = env.step(&SnekAct::Down);
            if step.is_terminated {
                assert_eq!(step.reward, -1.0);
                terminated = true;
                break;
            }
        }
        assert!(terminated);
    }

    #[test]
    fn without_walls_the_grid_wraps() {
        let config = SnekEnvConfig::default().walls(false);
        let mut env = SnekEnv::build(&config, 3).unwrap();
        env.fruit = Pos { x: 0, y: 0 };

        for _ in 0..env.config.hunger - 1 {
            let (step, _) = env.step(&SnekAct::Down);
            assert!(!step.is_terminated);
            let head = env.head();
            assert!(head.y >= 0 && head.y < env.config.height);
        }
    }

    #[test]
    fn hunger_truncates_the_episode() {
        let config = SnekEnvConfig::default().hunger(4);
        let mut env = SnekEnv::build(&config, 11).unwrap();
        // Keep the fruit away from the cells the snake oscillates over.
        env.fruit = Pos { x: 0, y: 0 };

        let mut steps = 0;
        loop {
            let act = if steps % 2 == 0 {
                SnekAct::Right
            } else {
                SnekAct::Left
            };
            let (step, _) = env.step(&act);
            steps += 1;
            assert!(!step.is_terminated);
            if step.is_truncated {
                break;
            }
        }
        assert_eq!(steps, 4);
    }
}
