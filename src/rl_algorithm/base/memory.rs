use burn::{prelude::Backend, tensor::Tensor};

use crate::burn_utils::{rows2tensor2, vec2tensor1};
use crate::error::Result;
use crate::rl_env::env::Action;

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub obs: Vec<f32>,
    pub action: Action,
    pub reward: f32,
    pub value: f32,    // V(obs) at collection time
    pub log_prob: f32, // joint log-prob under the collecting policy
    pub done: bool,    // true termination only
    pub truncated: bool,
}

/// One rollout of fixed length plus the value of the state after it.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    transitions: Vec<Transition>,
    bootstrap_value: f32,
}

impl Trajectory {
    pub fn with_capacity(horizon: usize) -> Self {
        Self {
            transitions: Vec::with_capacity(horizon),
            bootstrap_value: 0.0,
        }
    }

    pub fn from_transitions(transitions: Vec<Transition>, bootstrap_value: f32) -> Self {
        Self {
            transitions,
            bootstrap_value,
        }
    }

    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    pub fn set_bootstrap_value(&mut self, value: f32) {
        self.bootstrap_value = value;
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn bootstrap_value(&self) -> f32 {
        self.bootstrap_value
    }

    pub fn rewards(&self) -> Vec<f32> {
        self.transitions.iter().map(|t| t.reward).collect()
    }

    pub fn values(&self) -> Vec<f32> {
        self.transitions.iter().map(|t| t.value).collect()
    }

    pub fn dones(&self) -> Vec<bool> {
        self.transitions.iter().map(|t| t.done).collect()
    }

    /// (H, obs_dim)
    pub fn obs<B: Backend>(&self, device: &B::Device) -> Result<Tensor<B, 2>> {
        let rows: Vec<Vec<f32>> = self.transitions.iter().map(|t| t.obs.clone()).collect();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        rows2tensor2(&rows, width, device)
    }

    /// (H, action_dim); discrete indices are stored as floats.
    pub fn actions<B: Backend>(&self, device: &B::Device) -> Result<Tensor<B, 2>> {
        let rows: Vec<Vec<f32>> = self.transitions.iter().map(|t| t.action.as_row()).collect();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        rows2tensor2(&rows, width, device)
    }

    /// (H,)
    pub fn log_probs<B: Backend>(&self, device: &B::Device) -> Tensor<B, 1> {
        vec2tensor1(
            self.transitions.iter().map(|t| t.log_prob).collect::<Vec<f32>>(),
            device,
        )
    }
}
