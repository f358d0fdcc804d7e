pub mod burn_utils;
pub mod error;
pub mod ppo_run;
pub mod rl_algorithm;
pub mod rl_env;

pub use error::{PpoError, Result};
