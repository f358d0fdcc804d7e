use burn::config::Config;

use crate::error::{self, PpoError};

pub const VALUE_LOSS_COEF: f32 = 0.5;
pub const ENTROPY_COEF: f32 = 0.01;
/// An epoch whose approximate KL exceeds `KL_STOP_FACTOR * target_kl` is not applied.
pub const KL_STOP_FACTOR: f32 = 1.5;
pub const ADVANTAGE_EPS: f32 = 1e-8;

#[derive(Config, Debug)]
pub struct PPOTrainingConfig {
    #[config(default = 0.99)]
    pub gamma: f32,
    #[config(default = 0.95)]
    pub gae_lambda: f32,
    #[config(default = 0.2)]
    pub clip_ratio: f32,
    #[config(default = 0.01)]
    pub target_kl: f32,
    #[config(default = 0.5)]
    pub max_grad_norm: f32,
    #[config(default = 10)]
    pub update_epochs: usize,
    #[config(default = 3e-4)]
    pub actor_learning_rate: f64,
    #[config(default = 3e-4)]
    pub critic_learning_rate: f64,
}

impl Default for PPOTrainingConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PPOTrainingConfig {
    pub fn validate(&self) -> error::Result<()> {
        let invalid = |msg: String| Err(PpoError::Config(msg));
        if !(0.0..=1.0).contains(&self.gamma) {
            return invalid(format!("gamma must lie in [0, 1], got {}", self.gamma));
        }
        if !(0.0..=1.0).contains(&self.gae_lambda) {
            return invalid(format!("gae_lambda must lie in [0, 1], got {}", self.gae_lambda));
        }
        if !(self.clip_ratio > 0.0 && self.clip_ratio < 1.0) {
            return invalid(format!("clip_ratio must lie in (0, 1), got {}", self.clip_ratio));
        }
        if !(self.target_kl > 0.0) {
            return invalid(format!("target_kl must be positive, got {}", self.target_kl));
        }
        if !(self.max_grad_norm > 0.0) {
            return invalid(format!("max_grad_norm must be positive, got {}", self.max_grad_norm));
        }
        if self.update_epochs == 0 {
            return invalid("update_epochs must be at least 1".to_string());
        }
        if !(self.actor_learning_rate > 0.0 && self.critic_learning_rate > 0.0) {
            return invalid(format!(
                "learning rates must be positive, got actor={} critic={}",
                self.actor_learning_rate, self.critic_learning_rate
            ));
        }
        Ok(())
    }
}
