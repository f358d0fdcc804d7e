use crate::burn_utils::{build_mlp, Sequence};
use crate::rl_algorithm::base::model::BaselineModel;
use burn::prelude::*;

#[derive(Module, Debug)]
pub struct MLPCritic<B: Backend> {
    net: Sequence<B>,
}

impl<B: Backend> BaselineModel<B> for MLPCritic<B> {
    fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 1> {
        self.net.forward(input).flatten::<1>(0, 1)
    }
}

#[derive(Config, Debug)]
pub struct MLPCriticConfig {
    observation_dim: usize,
    hidden_dim: usize,
    #[config(default = 2)]
    n_layers: usize,
}

impl MLPCriticConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MLPCritic<B> {
        let net = build_mlp(
            self.observation_dim,
            1,
            self.n_layers,
            self.hidden_dim,
            device,
        );
        MLPCritic { net }
    }
}
