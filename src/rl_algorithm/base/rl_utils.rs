use super::memory::Trajectory;

#[derive(Debug, Clone, Default)]
pub struct UpdateInfo {
    pub total_loss: f32,
    pub actor_loss: f32,
    pub value_loss: f32,
    pub entropy: f32,
    pub kl: f32,
    pub epoch_kls: Vec<f32>,
    pub epochs_run: usize,
    pub applied_steps: usize,
    pub early_stopped: bool,
    pub actor_grad_norm: f32,
    pub critic_grad_norm: f32,
}

impl UpdateInfo {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Per-step advantage and value target, index-aligned with a `Trajectory`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvantageTargets {
    pub advantages: Vec<f32>,
    pub returns: Vec<f32>,
}

impl AdvantageTargets {
    pub fn len(&self) -> usize {
        self.advantages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advantages.is_empty()
    }
}

/// Generalized advantage estimation in one backward pass.
///
/// `done[t]` cuts both the bootstrap from `values[t + 1]` and the carried
/// advantage, so nothing leaks across an episode boundary. `bootstrap_value`
/// stands in for the value after the last step.
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    bootstrap_value: f32,
    gamma: f32,
    gae_lambda: f32,
) -> AdvantageTargets {
    let n = rewards.len();
    let mut advantages = vec![0.0f32; n];
    let mut returns = vec![0.0f32; n];

    let mut gae = 0.0f32;
    for t in (0..n).rev() {
        let next_value = if t + 1 == n {
            bootstrap_value
        } else {
            values[t + 1]
        };
        let not_done = if dones[t] { 0.0 } else { 1.0 };
        let delta = rewards[t] + gamma * next_value * not_done - values[t];
        gae = delta + gamma * gae_lambda * not_done * gae;
        advantages[t] = gae;
        returns[t] = gae + values[t];
    }

    AdvantageTargets {
        advantages,
        returns,
    }
}

pub fn estimate_advantages(
    trajectory: &Trajectory,
    gamma: f32,
    gae_lambda: f32,
) -> AdvantageTargets {
    compute_gae(
        &trajectory.rewards(),
        &trajectory.values(),
        &trajectory.dones(),
        trajectory.bootstrap_value(),
        gamma,
        gae_lambda,
    )
}

/// Zero mean, unit (unbiased) standard deviation.
pub fn normalize_advantages(advantages: &[f32], eps: f32) -> Vec<f32> {
    let n = advantages.len();
    if n < 2 {
        return vec![0.0; n];
    }
    let mean = advantages.iter().sum::<f32>() / n as f32;
    let var = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / (n - 1) as f32;
    let std = var.sqrt() + eps;
    advantages.iter().map(|a| (a - mean) / std).collect()
}

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}
