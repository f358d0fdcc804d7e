use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PpoError, Result};

pub mod categorical;
pub mod normal;

pub use categorical::MultiCategorical;
pub use normal::Normal;

/// Shape of the policy's action output, fixed once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionSpaceSpec {
    Continuous(usize),
    FactoredDiscrete(Vec<usize>),
}

impl ActionSpaceSpec {
    pub fn continuous(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(PpoError::UnsupportedActionSpace(
                "continuous action space with zero dimensions".to_string(),
            ));
        }
        Ok(ActionSpaceSpec::Continuous(dim))
    }

    pub fn factored_discrete(counts: Vec<usize>) -> Result<Self> {
        if counts.is_empty() {
            return Err(PpoError::UnsupportedActionSpace(
                "discrete action space with no dimensions".to_string(),
            ));
        }
        if let Some(dim) = counts.iter().position(|&n| n == 0) {
            return Err(PpoError::UnsupportedActionSpace(format!(
                "action dimension {dim} has no categories"
            )));
        }
        Ok(ActionSpaceSpec::FactoredDiscrete(counts))
    }

    /// Number of entries in one action vector.
    pub fn action_dim(&self) -> usize {
        match self {
            ActionSpaceSpec::Continuous(dim) => *dim,
            ActionSpaceSpec::FactoredDiscrete(counts) => counts.len(),
        }
    }

    /// Width of the policy network's final layer.
    pub fn policy_output_dim(&self) -> usize {
        match self {
            ActionSpaceSpec::Continuous(dim) => 2 * dim,
            ActionSpaceSpec::FactoredDiscrete(counts) => counts.iter().sum(),
        }
    }

    /// Interpret a raw (B, policy_output_dim) network output.
    pub fn distribution<B: Backend>(&self, output: Tensor<B, 2>) -> ActionDistribution<B> {
        match self {
            ActionSpaceSpec::Continuous(dim) => {
                let [batch_size, _] = output.dims();
                let mean = output.clone().slice([0..batch_size, 0..*dim]);
                let log_std = output.slice([0..batch_size, *dim..2 * dim]);
                ActionDistribution::Normal(Normal::new(mean, log_std))
            }
            ActionSpaceSpec::FactoredDiscrete(counts) => {
                ActionDistribution::MultiCategorical(MultiCategorical::new(output, counts))
            }
        }
    }
}

/// Action distribution of a batch of states. The variant follows the
/// `ActionSpaceSpec` the policy was built for.
#[derive(Debug, Clone)]
pub enum ActionDistribution<B: Backend> {
    Normal(Normal<B>),
    MultiCategorical(MultiCategorical<B>),
}

impl<B: Backend> ActionDistribution<B> {
    /// (B, ac_dim); discrete indices are carried as floats.
    pub fn sample(&self) -> Tensor<B, 2> {
        match self {
            ActionDistribution::Normal(normal) => normal.sample(),
            ActionDistribution::MultiCategorical(categorical) => categorical.sample(),
        }
    }

    /// Joint log-probability of each action row, (B,).
    pub fn log_prob(&self, value: Tensor<B, 2>) -> Tensor<B, 1> {
        match self {
            ActionDistribution::Normal(normal) => normal.independent_log_prob(value),
            ActionDistribution::MultiCategorical(categorical) => categorical.log_prob(value),
        }
    }

    /// Joint entropy of each row, (B,).
    pub fn entropy(&self) -> Tensor<B, 1> {
        match self {
            ActionDistribution::Normal(normal) => normal.independent_entropy(),
            ActionDistribution::MultiCategorical(categorical) => categorical.entropy(),
        }
    }

    pub fn mode(&self) -> Tensor<B, 2> {
        match self {
            ActionDistribution::Normal(normal) => normal.mode(),
            ActionDistribution::MultiCategorical(categorical) => categorical.mode(),
        }
    }

    pub fn kl_divergence(&self, other: &Self) -> Result<Tensor<B, 1>> {
        match (self, other) {
            (ActionDistribution::Normal(p), ActionDistribution::Normal(q)) => {
                if p.loc().dims() != q.loc().dims() {
                    return Err(PpoError::DistributionMismatch(format!(
                        "gaussian shapes {:?} vs {:?}",
                        p.loc().dims(),
                        q.loc().dims()
                    )));
                }
                Ok(p.kl_divergence(q))
            }
            (ActionDistribution::MultiCategorical(p), ActionDistribution::MultiCategorical(q)) => {
                p.kl_divergence(q)
            }
            _ => Err(PpoError::DistributionMismatch(
                "cannot compare a gaussian with a categorical policy".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    type B = NdArray;

    #[test]
    fn test_spec_validation() {
        assert!(ActionSpaceSpec::continuous(0).is_err());
        assert!(ActionSpaceSpec::factored_discrete(vec![]).is_err());
        assert!(ActionSpaceSpec::factored_discrete(vec![3, 0]).is_err());

        let spec = ActionSpaceSpec::factored_discrete(vec![3, 5, 2]).unwrap();
        assert_eq!(spec.action_dim(), 3);
        assert_eq!(spec.policy_output_dim(), 10);
        let spec = ActionSpaceSpec::continuous(2).unwrap();
        assert_eq!(spec.action_dim(), 2);
        assert_eq!(spec.policy_output_dim(), 4);
    }

    #[test]
    fn test_continuous_output_is_split_into_mean_and_log_std() {
        let spec = ActionSpaceSpec::continuous(2).unwrap();
        let output =
            Tensor::<B, 2>::from_floats([[0.5, -0.5, 5.0, -25.0]], &NdArrayDevice::default());
        let ActionDistribution::Normal(normal) = spec.distribution(output) else {
            panic!("expected a gaussian");
        };
        assert_eq!(normal.mode().into_data().to_vec::<f32>().unwrap(), vec![0.5, -0.5]);
        assert_eq!(
            normal.log_scale().into_data().to_vec::<f32>().unwrap(),
            vec![2.0, -20.0]
        );
    }

    #[test]
    fn test_kl_between_variants_is_an_error() {
        let device = NdArrayDevice::default();
        let gaussian = ActionSpaceSpec::continuous(1)
            .unwrap()
            .distribution(Tensor::<B, 2>::zeros([4, 2], &device));
        let discrete = ActionSpaceSpec::factored_discrete(vec![2])
            .unwrap()
            .distribution(Tensor::<B, 2>::zeros([4, 2], &device));

        assert!(matches!(
            gaussian.kl_divergence(&discrete),
            Err(PpoError::DistributionMismatch(_))
        ));
        let kl = gaussian.kl_divergence(&gaussian).unwrap();
        assert_eq!(kl.into_data().to_vec::<f32>().unwrap(), vec![0.0; 4]);
    }
}
