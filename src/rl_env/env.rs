use crate::burn_utils::distribution::ActionSpaceSpec;
use crate::error::{PpoError, Result};

/// Action space as advertised by the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSpace {
    Box { low: Vec<f32>, high: Vec<f32> },
    Discrete(usize),
    MultiDiscrete(Vec<usize>),
}

impl TryFrom<&ActionSpace> for ActionSpaceSpec {
    type Error = PpoError;

    fn try_from(space: &ActionSpace) -> Result<Self> {
        match space {
            ActionSpace::Box { low, high } => {
                if low.len() != high.len() {
                    return Err(PpoError::UnsupportedActionSpace(format!(
                        "box bounds have {} and {} entries",
                        low.len(),
                        high.len()
                    )));
                }
                ActionSpaceSpec::continuous(low.len())
            }
            ActionSpace::Discrete(n) => ActionSpaceSpec::factored_discrete(vec![*n]),
            ActionSpace::MultiDiscrete(counts) => ActionSpaceSpec::factored_discrete(counts.clone()),
        }
    }
}

/// One action vector: raw floats for a box space, one index per dimension
/// for a (multi-)discrete space.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Continuous(Vec<f32>),
    Discrete(Vec<usize>),
}

impl Action {
    /// Builds an action from a sampled row; discrete indices arrive as floats.
    pub fn from_row(spec: &ActionSpaceSpec, row: Vec<f32>) -> Self {
        match spec {
            ActionSpaceSpec::Continuous(_) => Action::Continuous(row),
            ActionSpaceSpec::FactoredDiscrete(_) => {
                Action::Discrete(row.into_iter().map(|x| x.round().max(0.0) as usize).collect())
            }
        }
    }

    pub fn as_row(&self) -> Vec<f32> {
        match self {
            Action::Continuous(values) => values.clone(),
            Action::Discrete(indices) => indices.iter().map(|&i| i as f32).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Action::Continuous(values) => values.len(),
            Action::Discrete(indices) => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvInfo {
    /// Signed gap to the lead opponent; negative once the agent is ahead.
    pub relative_distance: f32,
    pub success: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StepInfo {
    pub obs: Vec<f32>,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
    pub info: EnvInfo,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResetOptions {
    pub render: bool,
}

/// The simulator boundary. Dynamics, opponents and rendering live behind it.
pub trait RlEnv {
    type Error: std::error::Error + Send + Sync + 'static;

    fn observation_dim(&self) -> usize;

    fn action_space(&self) -> ActionSpace;

    fn reset(&mut self, options: ResetOptions) -> std::result::Result<(Vec<f32>, EnvInfo), Self::Error>;

    fn step(&mut self, action: &Action) -> std::result::Result<StepInfo, Self::Error>;
}
