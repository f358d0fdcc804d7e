use crate::burn_utils::distribution::{ActionDistribution, ActionSpaceSpec};
use crate::burn_utils::{build_mlp, Sequence};
use crate::rl_algorithm::base::model::ActorModel;
use burn::module::Ignored;
use burn::prelude::*;

#[derive(Module, Debug)]
pub struct MLPPolicy<B: Backend> {
    net: Sequence<B>,
    action_space: Ignored<ActionSpaceSpec>,
}

impl<B: Backend> ActorModel<B> for MLPPolicy<B> {
    fn forward(&self, input: Tensor<B, 2>) -> ActionDistribution<B> {
        let output = self.net.forward::<2>(input);
        self.action_space.distribution(output)
    }

    fn action_space(&self) -> ActionSpaceSpec {
        self.action_space.0.clone()
    }
}

#[derive(Config, Debug)]
pub struct MLPPolicyConfig {
    observation_dim: usize,
    hidden_dim: usize,
    action_space: ActionSpaceSpec,
    #[config(default = 2)]
    n_layers: usize,
}

impl MLPPolicyConfig {
    /// Continuous heads emit mean then log-std; discrete heads emit one logit
    /// block per action dimension.
    pub fn init<B: Backend>(&self, device: &B::Device) -> MLPPolicy<B> {
        let net = build_mlp(
            self.observation_dim,
            self.action_space.policy_output_dim(),
            self.n_layers,
            self.hidden_dim,
            device,
        );
        MLPPolicy {
            net,
            action_space: Ignored(self.action_space.clone()),
        }
    }
}
