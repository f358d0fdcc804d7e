use burn::module::{AutodiffModule, Module};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::burn_utils::distribution::{ActionDistribution, ActionSpaceSpec};
use crate::burn_utils::{rows2tensor2, tensor2vec1};
use crate::error::Result;
use crate::rl_env::env::Action;

use super::memory::Trajectory;
use super::rl_utils::{AdvantageTargets, UpdateInfo};

// for predicting the action distribution of a batch of states
pub trait ActorModel<B: Backend>: Module<B> {
    fn forward(&self, obs: Tensor<B, 2>) -> ActionDistribution<B>;

    fn action_space(&self) -> ActionSpaceSpec;
}

// for predicting values of states
pub trait BaselineModel<B: Backend>: Module<B> {
    fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 1>;
}

/// Adam with a 1e-8 epsilon for both networks.
pub fn adam_config() -> AdamConfig {
    AdamConfig::new().with_epsilon(1e-8)
}

/// Trainable weights of both networks plus their Adam states.
pub struct PolicyParameters<B: AutodiffBackend, AM: AutodiffModule<B>, BM: AutodiffModule<B>> {
    pub actor: AM,
    pub critic: BM,
    pub actor_optimizer: OptimizerAdaptor<Adam, AM, B>,
    pub critic_optimizer: OptimizerAdaptor<Adam, BM, B>,
}

impl<B: AutodiffBackend, AM: AutodiffModule<B>, BM: AutodiffModule<B>> PolicyParameters<B, AM, BM> {
    pub fn new(actor: AM, critic: BM) -> Self {
        Self {
            actor,
            critic,
            actor_optimizer: adam_config().init::<B, AM>(),
            critic_optimizer: adam_config().init::<B, BM>(),
        }
    }
}

/// What the policy did in one state during collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStep {
    pub action: Action,
    pub log_prob: f32,
    pub value: f32,
}

/// Snapshot of both networks on the non-autodiff backend. Nothing run
/// through it is recorded for backprop, and dropping it leaves the
/// trainable modules untouched.
pub struct InferenceMode<B: Backend, A: ActorModel<B>, C: BaselineModel<B>> {
    actor: A,
    critic: C,
    spec: ActionSpaceSpec,
    device: B::Device,
}

impl<B: Backend, A: ActorModel<B>, C: BaselineModel<B>> InferenceMode<B, A, C> {
    pub fn new(actor: A, critic: C) -> Self {
        let spec = actor.action_space();
        let device = actor.devices().into_iter().next().unwrap_or_default();
        Self {
            actor,
            critic,
            spec,
            device,
        }
    }

    pub fn enter<AB, AM, BM>(actor: &AM, critic: &BM) -> Self
    where
        AB: AutodiffBackend<InnerBackend = B>,
        AM: AutodiffModule<AB, InnerModule = A>,
        BM: AutodiffModule<AB, InnerModule = C>,
    {
        Self::new(actor.valid(), critic.valid())
    }

    pub fn action_space(&self) -> &ActionSpaceSpec {
        &self.spec
    }

    fn obs_tensor(&self, obs: &[f32]) -> Result<Tensor<B, 2>> {
        rows2tensor2(&[obs.to_vec()], obs.len(), &self.device)
    }

    pub fn distribution(&self, obs: &[f32]) -> Result<ActionDistribution<B>> {
        Ok(self.actor.forward(self.obs_tensor(obs)?))
    }

    pub fn value(&self, obs: &[f32]) -> Result<f32> {
        let value = self.critic.forward(self.obs_tensor(obs)?);
        Ok(tensor2vec1(&value).first().copied().unwrap_or_default())
    }

    /// Samples an action and records its log-probability and the state value.
    pub fn act(&self, obs: &[f32]) -> Result<PolicyStep> {
        let input = self.obs_tensor(obs)?;
        let dist = self.actor.forward(input.clone());
        let sample = dist.sample();
        let log_prob = tensor2vec1(&dist.log_prob(sample.clone()));
        let value = tensor2vec1(&self.critic.forward(input));
        let row: Vec<f32> = sample.into_data().iter::<f32>().collect();
        Ok(PolicyStep {
            action: Action::from_row(&self.spec, row),
            log_prob: log_prob.first().copied().unwrap_or_default(),
            value: value.first().copied().unwrap_or_default(),
        })
    }
}

pub trait RlTrainAlgorithm<
    B: AutodiffBackend,
    AM: ActorModel<B> + AutodiffModule<B>,
    BM: BaselineModel<B> + AutodiffModule<B>,
>
{
    fn train(
        &mut self,
        params: &mut PolicyParameters<B, AM, BM>,
        trajectory: &Trajectory,
        targets: &AdvantageTargets,
        device: &B::Device,
    ) -> Result<UpdateInfo>;
}
