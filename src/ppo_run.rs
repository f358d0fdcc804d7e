use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use burn::tensor::backend::AutodiffBackend;
use log::info;

use crate::burn_utils::distribution::ActionSpaceSpec;
use crate::error::Result;
use crate::rl_algorithm::base::checkpoint::load_checkpoint;
use crate::rl_algorithm::base::config::TrainConfig;
use crate::rl_algorithm::base::model::PolicyParameters;
use crate::rl_algorithm::base::on_policy_runner::OnPolicyRunner;
use crate::rl_algorithm::base::TrainingContext;
use crate::rl_algorithm::ppo::ppo_agent::PPO;
use crate::rl_algorithm::preload_net::mlp_critic::{MLPCritic, MLPCriticConfig};
use crate::rl_algorithm::preload_net::mlp_policy::{MLPPolicy, MLPPolicyConfig};
use crate::rl_env::env::RlEnv;
use crate::rl_env::env_sampler::EvalInfo;

pub type MlpParameters<B> = PolicyParameters<B, MLPPolicy<B>, MLPCritic<B>>;

/// Seeds the backend, then builds both networks for `env`'s spaces.
pub fn build_parameters<B: AutodiffBackend, E: RlEnv>(
    env: &E,
    config: &TrainConfig,
    device: &B::Device,
) -> Result<MlpParameters<B>> {
    let action_space = ActionSpaceSpec::try_from(&env.action_space())?;
    let ob_dim = env.observation_dim();
    info!("ob_dim={}, action_space={:?}", ob_dim, action_space);
    B::seed(config.seed);
    let actor_net = MLPPolicyConfig::new(ob_dim, config.hidden_dim, action_space).init::<B>(device);
    let baseline_net = MLPCriticConfig::new(ob_dim, config.hidden_dim).init::<B>(device);
    info!("actor_net={}", actor_net);
    info!("baseline_net={}", baseline_net);
    Ok(PolicyParameters::new(actor_net, baseline_net))
}

/// Full PPO training on `env`. Raising `stop` ends the run after the
/// current iteration; the latest checkpoint is written either way.
pub fn train_network<E: RlEnv, B: AutodiffBackend>(
    env: E,
    config: TrainConfig,
    device: B::Device,
    stop: Arc<AtomicBool>,
) -> Result<TrainingContext> {
    config.validate()?;
    let mut params = build_parameters::<B, E>(&env, &config, &device)?;
    let mut ppo_algo = PPO::<B, MLPPolicy<B>, MLPCritic<B>>::new(config.ppo_train_config.clone());
    let mut runner = OnPolicyRunner::<E, B>::new(env, device, config)?.with_stop_handle(stop);
    runner.train(&mut params, &mut ppo_algo)
}

/// Loads the named checkpoint and plays `config.eval_episodes` episodes.
pub fn evaluate_checkpoint<E: RlEnv, B: AutodiffBackend>(
    env: E,
    config: TrainConfig,
    device: B::Device,
    checkpoint_name: &str,
) -> Result<Vec<EvalInfo>> {
    config.validate()?;
    let mut params = build_parameters::<B, E>(&env, &config, &device)?;
    let dir = Path::new(&config.ckpt_save_path).join(checkpoint_name);
    load_checkpoint(&mut params, &dir, &device)?;
    let episodes = config.eval_episodes;
    let mut runner = OnPolicyRunner::<E, B>::new(env, device, config)?;
    runner.evaluate(&params, episodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PpoError;
    use crate::rl_algorithm::ppo::config::PPOTrainingConfig;
    use crate::rl_env::mock::{MockEnv, MockEnvConfig};
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};

    type AB = Autodiff<NdArray>;

    fn config(dir: &Path) -> TrainConfig {
        TrainConfig::new(PPOTrainingConfig::new().with_update_epochs(3))
            .with_hidden_dim(16)
            .with_horizon(12)
            .with_train_iter(2)
            .with_save_model_freq(1)
            .with_eval_episodes(2)
            .with_env_name("mock".to_string())
            .with_model_name("mlp".to_string())
            .with_ckpt_save_path(dir.join("ckpt").to_string_lossy().into_owned())
            .with_log_dir(dir.join("runs").to_string_lossy().into_owned())
    }

    fn continuous_env() -> MockEnv {
        MockEnv::new(
            MockEnvConfig::new()
                .with_continuous_dim(Some(2))
                .with_episode_len(5)
                .with_obs_noise(0.1),
        )
    }

    #[test]
    fn test_train_then_evaluate_continuous() {
        let dir = tempfile::tempdir().unwrap();
        let device = NdArrayDevice::default();
        let ctx = train_network::<_, AB>(
            continuous_env(),
            config(dir.path()),
            device,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        assert_eq!(ctx.iteration, 2);
        assert!(dir.path().join("ckpt/ppo_model_1_mock_mlp").is_dir());
        assert!(dir.path().join("ckpt/ppo_model_2_mock_mlp").is_dir());
        assert!(dir.path().join("runs").is_dir());

        let results =
            evaluate_checkpoint::<_, AB>(continuous_env(), config(dir.path()), device, "ppo_mock_mlp_latest")
                .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|info| info.steps == 5));
    }

    #[test]
    fn test_multi_discrete_rollout_and_update() {
        use crate::rl_algorithm::base::model::{InferenceMode, RlTrainAlgorithm};
        use crate::rl_algorithm::base::rl_utils::estimate_advantages;
        use crate::rl_env::env::Action;
        use crate::rl_env::env_sampler::collect_rollout;

        let dir = tempfile::tempdir().unwrap();
        let device = NdArrayDevice::default();
        let mut config = config(dir.path());
        config.ppo_train_config = PPOTrainingConfig::new()
            .with_update_epochs(3)
            .with_target_kl(1e3);
        let mut env = MockEnv::new(MockEnvConfig::new().with_action_counts(vec![3, 5, 2]));
        let mut params = build_parameters::<AB, _>(&env, &config, &device).unwrap();

        let (trajectory, _) = {
            let policy: InferenceMode<NdArray, MLPPolicy<NdArray>, MLPCritic<NdArray>> =
                InferenceMode::enter(&params.actor, &params.critic);
            collect_rollout(&mut env, &policy, config.horizon).unwrap()
        };
        assert_eq!(trajectory.len(), 12);
        for transition in trajectory.transitions() {
            let Action::Discrete(indices) = &transition.action else {
                panic!("expected discrete action");
            };
            assert_eq!(indices.len(), 3);
            assert!(indices[0] < 3 && indices[1] < 5 && indices[2] < 2);
            assert!(transition.log_prob <= 0.0);
        }

        let ppo_config = &config.ppo_train_config;
        let targets = estimate_advantages(&trajectory, ppo_config.gamma, ppo_config.gae_lambda);
        let mut ppo = PPO::<AB, MLPPolicy<AB>, MLPCritic<AB>>::new(ppo_config.clone());
        let info = ppo.train(&mut params, &trajectory, &targets, &device).unwrap();
        // old and new log-probs agree before the first step
        assert!(info.epoch_kls[0].abs() < 1e-4);
        assert_eq!(info.applied_steps, 3);
        assert!(!info.early_stopped);
    }

    #[test]
    fn test_train_multi_discrete() {
        let dir = tempfile::tempdir().unwrap();
        let env = MockEnv::new(MockEnvConfig::new().with_action_counts(vec![3, 5, 2]));
        let ctx = train_network::<_, AB>(
            env,
            config(dir.path()),
            NdArrayDevice::default(),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        assert_eq!(ctx.iteration, 2);
        assert!(dir.path().join("ckpt/ppo_mock_mlp_latest").is_dir());
    }

    #[test]
    fn test_unsupported_action_space() {
        let dir = tempfile::tempdir().unwrap();
        let env = MockEnv::new(MockEnvConfig::new().with_action_counts(vec![]));
        let result = train_network::<_, AB>(
            env,
            config(dir.path()),
            NdArrayDevice::default(),
            Arc::new(AtomicBool::new(false)),
        );
        assert!(matches!(result, Err(PpoError::UnsupportedActionSpace(_))));
    }

    #[test]
    fn test_missing_checkpoint_for_evaluation() {
        let dir = tempfile::tempdir().unwrap();
        let result = evaluate_checkpoint::<_, AB>(
            continuous_env(),
            config(dir.path()),
            NdArrayDevice::default(),
            "ppo_model_1000_mock_mlp",
        );
        assert!(matches!(result, Err(PpoError::CheckpointMissing(_))));
    }
}
