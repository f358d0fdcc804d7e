use burn::prelude::Backend;
use log::{debug, trace};

use crate::error::{PpoError, Result};
use crate::rl_algorithm::base::memory::{Trajectory, Transition};
use crate::rl_algorithm::base::model::{ActorModel, BaselineModel, InferenceMode, PolicyStep};

use super::env::{ResetOptions, RlEnv};

/// What collection and evaluation need from a policy.
pub trait RolloutPolicy {
    fn act(&self, obs: &[f32]) -> Result<PolicyStep>;

    fn value(&self, obs: &[f32]) -> Result<f32>;
}

impl<B: Backend, A: ActorModel<B>, C: BaselineModel<B>> RolloutPolicy for InferenceMode<B, A, C> {
    fn act(&self, obs: &[f32]) -> Result<PolicyStep> {
        InferenceMode::act(self, obs)
    }

    fn value(&self, obs: &[f32]) -> Result<f32> {
        InferenceMode::value(self, obs)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RolloutStats {
    /// Reward sums of the episodes that ended inside the rollout.
    pub episode_rewards: Vec<f32>,
}

impl RolloutStats {
    pub fn mean_episode_reward(&self) -> Option<f32> {
        if self.episode_rewards.is_empty() {
            return None;
        }
        Some(self.episode_rewards.iter().sum::<f32>() / self.episode_rewards.len() as f32)
    }

    pub fn min_episode_reward(&self) -> Option<f32> {
        self.episode_rewards.iter().copied().reduce(f32::min)
    }

    pub fn max_episode_reward(&self) -> Option<f32> {
        self.episode_rewards.iter().copied().reduce(f32::max)
    }
}

/// Runs `policy` for exactly `horizon` steps, resetting the environment
/// whenever an episode terminates or is truncated.
pub fn collect_rollout<E, P>(env: &mut E, policy: &P, horizon: usize) -> Result<(Trajectory, RolloutStats)>
where
    E: RlEnv,
    P: RolloutPolicy + ?Sized,
{
    let mut trajectory = Trajectory::with_capacity(horizon);
    let mut stats = RolloutStats::default();

    let (mut obs, _) = env
        .reset(ResetOptions::default())
        .map_err(|err| PpoError::env("reset", err))?;
    let mut episode_reward = 0.0;

    for step in 0..horizon {
        let PolicyStep {
            action,
            log_prob,
            value,
        } = policy.act(&obs)?;
        let step_info = env
            .step(&action)
            .map_err(|err| PpoError::env("step", err))?;
        episode_reward += step_info.reward;

        let next_obs = if step_info.terminated || step_info.truncated {
            trace!(
                "episode ended at step {} (terminated={}, truncated={})",
                step,
                step_info.terminated,
                step_info.truncated
            );
            stats.episode_rewards.push(episode_reward);
            episode_reward = 0.0;
            env.reset(ResetOptions::default())
                .map_err(|err| PpoError::env("reset", err))?
                .0
        } else {
            step_info.obs
        };

        trajectory.push(Transition {
            obs: std::mem::replace(&mut obs, next_obs),
            action,
            reward: step_info.reward,
            value,
            log_prob,
            done: step_info.terminated,
            truncated: step_info.truncated,
        });
    }

    // NOTE: when the last step ended an episode `obs` is already the reset
    // observation of the next one. Its value only enters GAE for a
    // truncated final step, since a terminal one masks it out.
    trajectory.set_bootstrap_value(policy.value(&obs)?);
    debug!(
        "collected {} transitions, {} finished episodes",
        trajectory.len(),
        stats.episode_rewards.len()
    );
    Ok((trajectory, stats))
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalInfo {
    pub episode_reward: f32,
    pub min_relative_distance: f32,
    pub success: bool,
    pub steps: usize,
}

/// Plays one stochastic episode to termination or truncation. Parameters
/// are only read.
pub fn run_eval_episode<E, P>(env: &mut E, policy: &P, render: bool) -> Result<EvalInfo>
where
    E: RlEnv,
    P: RolloutPolicy + ?Sized,
{
    let (mut obs, _) = env
        .reset(ResetOptions { render })
        .map_err(|err| PpoError::env("reset", err))?;
    let mut info = EvalInfo {
        episode_reward: 0.0,
        min_relative_distance: f32::INFINITY,
        success: false,
        steps: 0,
    };
    loop {
        let step = policy.act(&obs)?;
        let step_info = env
            .step(&step.action)
            .map_err(|err| PpoError::env("step", err))?;
        info.episode_reward += step_info.reward;
        info.min_relative_distance = info
            .min_relative_distance
            .min(step_info.info.relative_distance);
        info.success = step_info.info.success;
        info.steps += 1;
        if step_info.terminated || step_info.truncated {
            break;
        }
        obs = step_info.obs;
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl_env::env::Action;
    use crate::rl_env::mock::{MockEnv, MockEnvConfig};
    use std::cell::RefCell;

    /// Always the same action; records every observation it is asked about.
    struct FixedPolicy {
        action: Action,
        seen: RefCell<Vec<Vec<f32>>>,
    }

    impl FixedPolicy {
        fn new(action: Action) -> Self {
            Self {
                action,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl RolloutPolicy for FixedPolicy {
        fn act(&self, obs: &[f32]) -> Result<PolicyStep> {
            self.seen.borrow_mut().push(obs.to_vec());
            Ok(PolicyStep {
                action: self.action.clone(),
                log_prob: -0.5,
                value: obs[0],
            })
        }

        fn value(&self, obs: &[f32]) -> Result<f32> {
            Ok(100.0 + obs[0])
        }
    }

    #[test]
    fn test_rollout_spans_episode_boundaries() {
        let mut env = MockEnv::new(MockEnvConfig::new().with_episode_len(3));
        let policy = FixedPolicy::new(Action::Discrete(vec![1]));
        let (traj, stats) = collect_rollout(&mut env, &policy, 7).unwrap();

        assert_eq!(traj.len(), 7);
        assert_eq!(
            traj.dones(),
            vec![false, false, true, false, false, true, false]
        );
        assert_eq!(stats.episode_rewards, vec![3.0, 3.0]);
        assert_eq!(env.resets(), 3);
        // the step counter of the mock restarts at every reset
        let first_obs: Vec<f32> = traj.transitions().iter().map(|t| t.obs[0]).collect();
        assert_eq!(first_obs, vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0]);
        assert_eq!(traj.bootstrap_value(), 101.0);
    }

    #[test]
    fn test_truncation_resets_without_done() {
        let mut env = MockEnv::new(
            MockEnvConfig::new()
                .with_episode_len(2)
                .with_truncate(true),
        );
        let policy = FixedPolicy::new(Action::Discrete(vec![0]));
        let (traj, stats) = collect_rollout(&mut env, &policy, 4).unwrap();

        assert_eq!(traj.dones(), vec![false; 4]);
        let truncated: Vec<bool> = traj.transitions().iter().map(|t| t.truncated).collect();
        assert_eq!(truncated, vec![false, true, false, true]);
        assert_eq!(stats.episode_rewards.len(), 2);
        // last step ended an episode, so the bootstrap comes from the reset state
        assert_eq!(traj.bootstrap_value(), 100.0);
    }

    #[test]
    fn test_env_failure_propagates() {
        let mut env = MockEnv::new(MockEnvConfig::new().with_fail_at_step(Some(2)));
        let policy = FixedPolicy::new(Action::Discrete(vec![0]));
        let err = collect_rollout(&mut env, &policy, 5).unwrap_err();
        assert!(matches!(err, PpoError::Env { stage: "step", .. }));
        assert_eq!(policy.seen.borrow().len(), 3);
    }

    #[test]
    fn test_eval_episode() {
        let mut env = MockEnv::new(MockEnvConfig::new().with_episode_len(4));
        let policy = FixedPolicy::new(Action::Discrete(vec![1]));
        let info = run_eval_episode(&mut env, &policy, true).unwrap();

        assert_eq!(info.steps, 4);
        assert_eq!(info.episode_reward, 4.0);
        // the gap closes by one per step and starts at 2
        assert_eq!(info.min_relative_distance, -2.0);
        assert!(info.success);
        assert!(env.last_render());
    }

    #[test]
    fn test_rollout_stats() {
        let stats = RolloutStats {
            episode_rewards: vec![1.0, -2.0, 4.0],
        };
        assert_eq!(stats.mean_episode_reward(), Some(1.0));
        assert_eq!(stats.min_episode_reward(), Some(-2.0));
        assert_eq!(stats.max_episode_reward(), Some(4.0));
        assert_eq!(RolloutStats::default().mean_episode_reward(), None);
    }
}
