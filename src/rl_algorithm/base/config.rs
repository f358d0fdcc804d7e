use burn::config::Config;

use crate::error::{self, PpoError};
use crate::rl_algorithm::ppo::config::PPOTrainingConfig;

#[derive(Config, Debug)]
pub struct TrainConfig {
    pub ppo_train_config: PPOTrainingConfig,
    #[config(default = 256)]
    pub hidden_dim: usize,
    /// Number of collect/update iterations (one evaluation episode each).
    #[config(default = 1000)]
    pub train_iter: usize,
    /// Transitions per rollout.
    #[config(default = 2048)]
    pub horizon: usize,
    #[config(default = 100)]
    pub save_model_freq: usize,
    #[config(default = "String::from(\"./checkpoints\")")]
    pub ckpt_save_path: String,
    #[config(default = "String::from(\"runs\")")]
    pub log_dir: String,
    #[config(default = "String::from(\"barc-v1-race\")")]
    pub env_name: String,
    #[config(default = "String::from(\"ppo\")")]
    pub model_name: String,
    /// Suffix of the experiment name and of the `ppo_{tag}_latest` checkpoint.
    pub run_tag: Option<String>,
    #[config(default = 42)]
    pub seed: u64,
    /// Resume from `ppo_model_{n}_{env_name}_{model_name}` and continue at iteration `n`.
    pub resume_iteration: Option<usize>,
    /// IANA zone used for experiment timestamps.
    #[config(default = "String::from(\"UTC\")")]
    pub log_timezone: String,
    #[config(default = true)]
    pub render_eval: bool,
    #[config(default = 25)]
    pub eval_episodes: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self::new(PPOTrainingConfig::default())
    }
}

impl TrainConfig {
    pub fn validate(&self) -> error::Result<()> {
        self.ppo_train_config.validate()?;
        if self.horizon == 0 {
            return Err(PpoError::Config("horizon must be at least 1".to_string()));
        }
        if self.hidden_dim == 0 {
            return Err(PpoError::Config("hidden_dim must be at least 1".to_string()));
        }
        if self.save_model_freq == 0 {
            return Err(PpoError::Config(
                "save_model_freq must be at least 1".to_string(),
            ));
        }
        if self.log_timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(PpoError::Config(format!(
                "unknown timezone {}",
                self.log_timezone
            )));
        }
        Ok(())
    }

    pub fn run_tag(&self) -> String {
        self.run_tag
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.env_name, self.model_name))
    }

    /// Directory of the periodic checkpoint taken after `iteration` iterations.
    pub fn periodic_checkpoint_name(&self, iteration: usize) -> String {
        format!(
            "ppo_model_{}_{}_{}",
            iteration, self.env_name, self.model_name
        )
    }

    pub fn latest_checkpoint_name(&self) -> String {
        format!("ppo_{}_latest", self.run_tag())
    }
}
