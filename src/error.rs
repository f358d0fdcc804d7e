use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum PpoError {
    #[error("unsupported action space: {0}")]
    UnsupportedActionSpace(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("checkpoint {0} doesn't exist")]
    CheckpointMissing(PathBuf),

    #[error("failed to {op} checkpoint field `{field}` at {path}: {reason}")]
    Checkpoint {
        op: &'static str,
        field: &'static str,
        path: PathBuf,
        reason: String,
    },

    /// Raised by the environment during `reset` or `step`. Never retried here.
    #[error("environment failed during {stage}: {source}")]
    Env {
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("distribution mismatch: {0}")]
    DistributionMismatch(String),

    #[error("cannot update on an empty trajectory")]
    EmptyTrajectory,

    #[error("trajectory has {trajectory} transitions but {targets} advantage targets")]
    Misaligned { trajectory: usize, targets: usize },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PpoError {
    pub(crate) fn env<E>(stage: &'static str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PpoError::Env {
            stage,
            source: Box::new(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, PpoError>;
