pub mod base;
pub mod ppo;
pub mod preload_net;
