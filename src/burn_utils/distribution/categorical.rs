use burn::tensor::activation::log_softmax;
use burn::tensor::Distribution as td;
use burn::tensor::{backend::Backend, Tensor};

use crate::error::{PpoError, Result};

// keeps log(-log(u)) finite
const GUMBEL_EPS: f32 = 1e-10;

/// Independent categoricals, one per action dimension, over a partitioned
/// logits vector.
#[derive(Debug, Clone)]
pub struct MultiCategorical<B: Backend> {
    logits: Vec<Tensor<B, 2>>,    // 每个动作维度一块 (B, n_i)
    log_probs: Vec<Tensor<B, 2>>, // normalised log-probs, same layout
}

impl<B: Backend> MultiCategorical<B> {
    /// `logits` is (B, sum(nvec)); block `i` covers the next `nvec[i]` columns.
    pub fn new(logits: Tensor<B, 2>, nvec: &[usize]) -> Self {
        let [batch_size, width] = logits.dims();
        debug_assert_eq!(width, nvec.iter().sum::<usize>());

        let mut start = 0;
        let mut blocks = Vec::with_capacity(nvec.len());
        let mut log_probs = Vec::with_capacity(nvec.len());
        for &n in nvec {
            let block = logits.clone().slice([0..batch_size, start..start + n]);
            log_probs.push(log_softmax(block.clone(), 1));
            blocks.push(block);
            start += n;
        }
        Self {
            logits: blocks,
            log_probs,
        }
    }

    pub fn nvec(&self) -> Vec<usize> {
        self.logits.iter().map(|block| block.dims()[1]).collect()
    }

    fn batch_size(&self) -> usize {
        self.logits.first().map(|block| block.dims()[0]).unwrap_or(0)
    }

    fn zeros(&self) -> Tensor<B, 1> {
        let device = self
            .logits
            .first()
            .map(|block| block.device())
            .unwrap_or_default();
        Tensor::zeros([self.batch_size()], &device)
    }

    /// Gumbel-max draw per dimension, indices returned as floats (B, ac_dim).
    pub fn sample(&self) -> Tensor<B, 2> {
        let picks = self
            .logits
            .iter()
            .map(|block| {
                let uniform = Tensor::<B, 2>::random(
                    block.shape(),
                    td::Uniform(0.0, 1.0),
                    &block.device(),
                )
                .clamp(GUMBEL_EPS, 1.0 - 1e-7);
                let gumbel = uniform.log().neg().log().neg();
                (block.clone() + gumbel).argmax(1).float()
            })
            .collect();
        Tensor::cat(picks, 1)
    }

    pub fn mode(&self) -> Tensor<B, 2> {
        let picks = self
            .logits
            .iter()
            .map(|block| block.clone().argmax(1).float())
            .collect();
        Tensor::cat(picks, 1)
    }

    /// Log-probability of each dimension's chosen index, one (B,) tensor per dim.
    pub fn component_log_probs(&self, value: Tensor<B, 2>) -> Vec<Tensor<B, 1>> {
        let batch_size = self.batch_size();
        self.log_probs
            .iter()
            .enumerate()
            .map(|(i, lp)| {
                let idx = value.clone().slice([0..batch_size, i..i + 1]).int();
                lp.clone().gather(1, idx).flatten::<1>(0, 1)
            })
            .collect()
    }

    pub fn log_prob(&self, value: Tensor<B, 2>) -> Tensor<B, 1> {
        self.component_log_probs(value)
            .into_iter()
            .fold(self.zeros(), |acc, lp| acc + lp)
    }

    pub fn component_entropies(&self) -> Vec<Tensor<B, 1>> {
        self.log_probs
            .iter()
            .map(|lp| {
                (lp.clone().exp() * lp.clone())
                    .sum_dim(1)
                    .flatten::<1>(0, 1)
                    .neg()
            })
            .collect()
    }

    pub fn entropy(&self) -> Tensor<B, 1> {
        self.component_entropies()
            .into_iter()
            .fold(self.zeros(), |acc, h| acc + h)
    }

    /// KL(self || other), summed over dimensions. Both sides must share `nvec`.
    pub fn kl_divergence(&self, other: &Self) -> Result<Tensor<B, 1>> {
        if self.nvec() != other.nvec() {
            return Err(PpoError::DistributionMismatch(format!(
                "category counts {:?} vs {:?}",
                self.nvec(),
                other.nvec()
            )));
        }
        Ok(self
            .log_probs
            .iter()
            .zip(other.log_probs.iter())
            .map(|(p, q)| {
                (p.clone().exp() * (p.clone() - q.clone()))
                    .sum_dim(1)
                    .flatten::<1>(0, 1)
            })
            .fold(self.zeros(), |acc, kl| acc + kl))
    }
}
