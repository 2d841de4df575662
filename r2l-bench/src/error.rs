use thiserror::Error;

pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors raised while deriving the constructor arguments of a method for an environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{method}: the {module} module needs a discrete action space")]
    DiscreteActionSpaceRequired {
        method: String,
        module: &'static str,
    },

    #[error(
        "{method}: convolutional networks need a channel first observation, got shape {shape:?}"
    )]
    ObservationRank { method: String, shape: Vec<usize> },

    #[error("{method}: {network} can not be used as the {slot}")]
    UnsupportedNetworkSlot {
        method: String,
        network: &'static str,
        slot: &'static str,
    },

    #[error("{method}: {field} is required")]
    MissingField { method: String, field: &'static str },
}

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("there are no experiments to launch")]
    NoExperiments,

    #[error("unknown benchmark batch: {0}")]
    UnknownBatch(String),

    #[error("unknown policy learner: {0}")]
    UnknownLearner(String),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("job queue closed before every run was scheduled")]
    QueueClosed,

    #[error("plotting failed: {0}")]
    Plot(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tensor error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
