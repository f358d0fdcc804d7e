//! Scripted environment for tests. The agent starts `2` behind the leader and
//! closes the gap by one per step; an episode lasts `episode_len` steps.
use burn::config::Config;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use super::env::{Action, ActionSpace, EnvInfo, ResetOptions, RlEnv, StepInfo};

#[derive(Debug, Error)]
#[error("scripted failure at step {0}")]
pub struct MockEnvError(pub usize);

#[derive(Config, Debug)]
pub struct MockEnvConfig {
    #[config(default = 3)]
    pub obs_dim: usize,
    #[config(default = 5)]
    pub episode_len: usize,
    /// End episodes by truncation instead of termination.
    #[config(default = false)]
    pub truncate: bool,
    /// Global step index whose `step` call fails.
    pub fail_at_step: Option<usize>,
    /// Box action space of this width instead of the discrete one.
    pub continuous_dim: Option<usize>,
    #[config(default = "vec![2]")]
    pub action_counts: Vec<usize>,
    #[config(default = 0.0)]
    pub obs_noise: f32,
    #[config(default = 0)]
    pub seed: u64,
}

pub struct MockEnv {
    config: MockEnvConfig,
    t: usize,
    total_steps: usize,
    resets: usize,
    last_render: bool,
    rng: StdRng,
}

impl MockEnv {
    pub fn new(config: MockEnvConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            t: 0,
            total_steps: 0,
            resets: 0,
            last_render: false,
            rng,
        }
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn last_render(&self) -> bool {
        self.last_render
    }

    fn gap(&self) -> f32 {
        2.0 - self.t as f32
    }

    fn obs(&mut self) -> Vec<f32> {
        let mut obs = vec![0.0; self.config.obs_dim];
        let noise = if self.config.obs_noise > 0.0 {
            self.config.obs_noise * self.rng.random_range(-1.0f32..1.0)
        } else {
            0.0
        };
        for (i, x) in obs.iter_mut().enumerate() {
            *x = match i {
                0 => self.t as f32,
                1 => self.gap(),
                _ => 1.0 + noise,
            };
        }
        obs
    }

    fn reward(&self, action: &Action) -> f32 {
        match action {
            Action::Discrete(indices) => {
                let target = self.config.action_counts.first().map_or(0, |n| n - 1);
                if indices.first() == Some(&target) {
                    1.0
                } else {
                    0.0
                }
            }
            Action::Continuous(values) => 1.0 - values.first().map_or(0.0, |a| (a - 0.5).abs()),
        }
    }
}

impl RlEnv for MockEnv {
    type Error = MockEnvError;

    fn observation_dim(&self) -> usize {
        self.config.obs_dim
    }

    fn action_space(&self) -> ActionSpace {
        match self.config.continuous_dim {
            Some(dim) => ActionSpace::Box {
                low: vec![-1.0; dim],
                high: vec![1.0; dim],
            },
            None if self.config.action_counts.len() == 1 => {
                ActionSpace::Discrete(self.config.action_counts[0])
            }
            None => ActionSpace::MultiDiscrete(self.config.action_counts.clone()),
        }
    }

    fn reset(&mut self, options: ResetOptions) -> Result<(Vec<f32>, EnvInfo), Self::Error> {
        self.t = 0;
        self.resets += 1;
        self.last_render = options.render;
        let info = EnvInfo {
            relative_distance: self.gap(),
            success: false,
        };
        Ok((self.obs(), info))
    }

    fn step(&mut self, action: &Action) -> Result<StepInfo, Self::Error> {
        if self.config.fail_at_step == Some(self.total_steps) {
            return Err(MockEnvError(self.total_steps));
        }
        self.total_steps += 1;
        let reward = self.reward(action);
        self.t += 1;
        let ended = self.t >= self.config.episode_len;
        let info = EnvInfo {
            relative_distance: self.gap(),
            success: ended && self.gap() < 0.0,
        };
        Ok(StepInfo {
            obs: self.obs(),
            reward,
            terminated: ended && !self.config.truncate,
            truncated: ended && self.config.truncate,
            info,
        })
    }
}
