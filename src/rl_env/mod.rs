pub mod env;
pub mod env_sampler;
#[cfg(test)]
pub mod mock;
