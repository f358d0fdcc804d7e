use std::marker::PhantomData;

use burn::module::AutodiffModule;
use burn::nn::loss::{MseLoss, Reduction};
use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::cast::ToElement;
use log::{debug, trace};

use crate::burn_utils::{clip_grad_norm, vec2tensor1};
use crate::error::{PpoError, Result};
use crate::rl_algorithm::base::memory::Trajectory;
use crate::rl_algorithm::base::model::{
    ActorModel, BaselineModel, PolicyParameters, RlTrainAlgorithm,
};
use crate::rl_algorithm::base::rl_utils::{
    mean, normalize_advantages, AdvantageTargets, UpdateInfo,
};

use super::config::{
    PPOTrainingConfig, ADVANTAGE_EPS, ENTROPY_COEF, KL_STOP_FACTOR, VALUE_LOSS_COEF,
};

/// `-mean(min(ρA, clip(ρ, 1-ε, 1+ε)A))` with `ρ = exp(new - old)`.
pub fn clipped_surrogate_loss<B: Backend>(
    new_log_probs: Tensor<B, 1>,
    old_log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
    clip_ratio: f32,
) -> Tensor<B, 1> {
    let ratio = (new_log_probs - old_log_probs).exp();
    let clipped_ratio = ratio.clone().clamp(1.0 - clip_ratio, 1.0 + clip_ratio);
    let surrogate = ratio * advantages.clone();
    let clipped_surrogate = clipped_ratio * advantages;
    -surrogate.min_pair(clipped_surrogate).mean()
}

pub struct PpoLoss<B: Backend> {
    pub total: Tensor<B, 1>,
    pub actor: Tensor<B, 1>,
    pub value: Tensor<B, 1>,
    pub entropy: Tensor<B, 1>,
    /// `mean(old - new)`, detached.
    pub approx_kl: Tensor<B, 1>,
}

/// Joint actor/critic loss on a full batch under the current parameters.
#[allow(clippy::too_many_arguments)]
pub fn compute_ppo_loss<B: Backend, A: ActorModel<B>, C: BaselineModel<B>>(
    actor: &A,
    critic: &C,
    obs: Tensor<B, 2>,
    actions: Tensor<B, 2>,
    old_log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
    returns: Tensor<B, 1>,
    clip_ratio: f32,
) -> PpoLoss<B> {
    let dist = actor.forward(obs.clone());
    let new_log_probs = dist.log_prob(actions);
    let entropy = dist.entropy().mean();

    let actor_loss = clipped_surrogate_loss(
        new_log_probs.clone(),
        old_log_probs.clone(),
        advantages,
        clip_ratio,
    );
    let values = critic.forward(obs);
    let value_loss = MseLoss::new().forward(values, returns, Reduction::Mean);

    let total = actor_loss.clone() + value_loss.clone().mul_scalar(VALUE_LOSS_COEF)
        - entropy.clone().mul_scalar(ENTROPY_COEF);
    let approx_kl = (old_log_probs - new_log_probs.detach()).mean();

    PpoLoss {
        total,
        actor: actor_loss,
        value: value_loss,
        entropy,
        approx_kl,
    }
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    tensor.into_scalar().to_f32()
}

pub struct PPO<B: AutodiffBackend, AM: ActorModel<B>, BM: BaselineModel<B>> {
    config: PPOTrainingConfig,
    backend: PhantomData<B>,
    actor: PhantomData<AM>,
    baseline_net: PhantomData<BM>,
}

impl<B: AutodiffBackend, AM: ActorModel<B>, BM: BaselineModel<B>> PPO<B, AM, BM> {
    pub fn new(config: PPOTrainingConfig) -> Self {
        Self {
            config,
            backend: PhantomData,
            actor: PhantomData,
            baseline_net: PhantomData,
        }
    }

    pub fn config(&self) -> &PPOTrainingConfig {
        &self.config
    }
}

impl<
        B: AutodiffBackend,
        AM: ActorModel<B> + AutodiffModule<B>,
        BM: BaselineModel<B> + AutodiffModule<B>,
    > RlTrainAlgorithm<B, AM, BM> for PPO<B, AM, BM>
{
    fn train(
        &mut self,
        params: &mut PolicyParameters<B, AM, BM>,
        trajectory: &Trajectory,
        targets: &AdvantageTargets,
        device: &B::Device,
    ) -> Result<UpdateInfo> {
        if trajectory.is_empty() {
            return Err(PpoError::EmptyTrajectory);
        }
        if trajectory.len() != targets.len() || targets.returns.len() != targets.len() {
            return Err(PpoError::Misaligned {
                trajectory: trajectory.len(),
                targets: targets.len(),
            });
        }
        let ppo_config = &self.config;

        let obs = trajectory.obs::<B>(device)?;
        let actions = trajectory.actions::<B>(device)?;
        // frozen: no graph back to the collecting policy
        let old_log_probs = trajectory.log_probs::<B>(device);
        let advantages = vec2tensor1::<B, f32>(
            normalize_advantages(&targets.advantages, ADVANTAGE_EPS),
            device,
        );
        let returns = vec2tensor1::<B, f32>(targets.returns.clone(), device);

        let mut update_info = UpdateInfo::new();
        let mut total_losses = Vec::with_capacity(ppo_config.update_epochs);
        let mut value_losses = Vec::with_capacity(ppo_config.update_epochs);
        let mut actor_losses = Vec::with_capacity(ppo_config.update_epochs);
        let mut entropies = Vec::with_capacity(ppo_config.update_epochs);
        let mut actor_grad_norms = Vec::with_capacity(ppo_config.update_epochs);
        let mut critic_grad_norms = Vec::with_capacity(ppo_config.update_epochs);

        for epoch in 0..ppo_config.update_epochs {
            let loss = compute_ppo_loss(
                &params.actor,
                &params.critic,
                obs.clone(),
                actions.clone(),
                old_log_probs.clone(),
                advantages.clone(),
                returns.clone(),
                ppo_config.clip_ratio,
            );
            let kl = scalar(loss.approx_kl);
            total_losses.push(scalar(loss.total.clone()));
            value_losses.push(scalar(loss.value));
            actor_losses.push(scalar(loss.actor));
            entropies.push(scalar(loss.entropy));
            update_info.epoch_kls.push(kl);
            update_info.epochs_run += 1;
            trace!("epoch={} kl={} total_loss={:?}", epoch, kl, total_losses.last());

            if kl > KL_STOP_FACTOR * ppo_config.target_kl {
                debug!(
                    "early stopping at epoch {} due to reaching max kl: {:.6}",
                    epoch, kl
                );
                update_info.early_stopped = true;
                break;
            }

            let mut grads = loss.total.backward();
            let mut actor_grads = GradientsParams::from_module::<B, AM>(&mut grads, &params.actor);
            let mut critic_grads =
                GradientsParams::from_module::<B, BM>(&mut grads, &params.critic);
            actor_grad_norms.push(clip_grad_norm::<B, AM>(
                &params.actor,
                &mut actor_grads,
                ppo_config.max_grad_norm,
            ));
            critic_grad_norms.push(clip_grad_norm::<B, BM>(
                &params.critic,
                &mut critic_grads,
                ppo_config.max_grad_norm,
            ));

            params.actor = params.actor_optimizer.step(
                ppo_config.actor_learning_rate,
                params.actor.clone(),
                actor_grads,
            );
            params.critic = params.critic_optimizer.step(
                ppo_config.critic_learning_rate,
                params.critic.clone(),
                critic_grads,
            );
            update_info.applied_steps += 1;
        }

        update_info.total_loss = mean(&total_losses);
        update_info.value_loss = mean(&value_losses);
        update_info.actor_loss = mean(&actor_losses);
        update_info.entropy = mean(&entropies);
        update_info.kl = mean(&update_info.epoch_kls);
        update_info.actor_grad_norm = mean(&actor_grad_norms);
        update_info.critic_grad_norm = mean(&critic_grad_norms);
        Ok(update_info)
    }
}
