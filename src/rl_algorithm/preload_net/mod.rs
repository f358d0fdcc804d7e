pub mod mlp_critic;
pub mod mlp_policy;
