use burn::tensor::Distribution as td;
use burn::tensor::{backend::Backend, Tensor};
use std::f32::consts::PI;

pub const LOG_STD_MIN: f32 = -20.0;
pub const LOG_STD_MAX: f32 = 2.0;

/// Diagonal Gaussian over a batch of action vectors.
#[derive(Debug, Clone)]
pub struct Normal<B: Backend> {
    loc: Tensor<B, 2>,       // 均值 (B, ac_dim)
    log_scale: Tensor<B, 2>, // log 标准差 (B, ac_dim), clamped to [LOG_STD_MIN, LOG_STD_MAX]
}

impl<B: Backend> Normal<B> {
    pub fn new(loc: Tensor<B, 2>, log_scale: Tensor<B, 2>) -> Self {
        Self {
            loc,
            log_scale: log_scale.clamp(LOG_STD_MIN, LOG_STD_MAX),
        }
    }

    pub fn loc(&self) -> Tensor<B, 2> {
        self.loc.clone()
    }

    pub fn log_scale(&self) -> Tensor<B, 2> {
        self.log_scale.clone()
    }

    pub fn scale(&self) -> Tensor<B, 2> {
        self.log_scale.clone().exp()
    }

    pub fn sample(&self) -> Tensor<B, 2> {
        let standard_normal =
            Tensor::<B, 2>::random(self.loc.shape(), td::Normal(0.0, 1.0), &self.loc.device());
        self.loc.clone() + standard_normal * self.scale()
    }

    /// Per-dimension log density, (B, ac_dim).
    pub fn log_prob(&self, value: Tensor<B, 2>) -> Tensor<B, 2> {
        let var = self.log_scale.clone().mul_scalar(2.0).exp();
        -((value - self.loc.clone()).powf_scalar(2.0) / var.mul_scalar(2.0))
            - self.log_scale.clone()
            - (2f32 * PI).sqrt().ln()
    }

    /// Joint log density of each action vector, (B,).
    pub fn independent_log_prob(&self, value: Tensor<B, 2>) -> Tensor<B, 1> {
        self.log_prob(value).sum_dim(1).flatten::<1>(0, 1)
    }

    pub fn entropy(&self) -> Tensor<B, 2> {
        self.log_scale
            .clone()
            .add_scalar(0.5 + 0.5 * (2f32 * PI).ln())
    }

    pub fn independent_entropy(&self) -> Tensor<B, 1> {
        self.entropy().sum_dim(1).flatten::<1>(0, 1)
    }

    pub fn mode(&self) -> Tensor<B, 2> {
        self.loc.clone()
    }

    /// KL(self || other), summed over action dimensions.
    pub fn kl_divergence(&self, other: &Self) -> Tensor<B, 1> {
        let var_p = self.log_scale.clone().mul_scalar(2.0).exp();
        let var_q = other.log_scale.clone().mul_scalar(2.0).exp();
        let mean_diff = (self.loc.clone() - other.loc.clone()).powf_scalar(2.0);
        let kl = other.log_scale.clone() - self.log_scale.clone()
            + (var_p + mean_diff) / var_q.mul_scalar(2.0)
            - 0.5;
        kl.sum_dim(1).flatten::<1>(0, 1)
    }
}
