use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors raised across the compilation pipeline.
///
/// Structural errors abort the current compilation and name the offending
/// object, edge or operator. Configuration errors are reported before any
/// partial output is produced. Non-fatal conditions (a hard-placement object
/// pre-assigned to the wrong component) are `tracing::warn!`s, never errors.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("dependency cycle involving operator {0}")]
    DependencyCycle(String),

    #[error("object {0} has no component assignment after propagation")]
    UnassignedObject(String),

    #[error("probe {0} has no component assignment after propagation")]
    UnassignedProbe(String),

    #[error(
        "non-filtered edge {edge} straddles component boundaries: \
         source assigned to {src}, target assigned to {target}"
    )]
    StraddlingEdge {
        edge: String,
        src: usize,
        target: usize,
    },

    #[error("crossing edge {0} carries no persisted update and cannot be split")]
    UnsplittableCrossing(String),

    #[error("crossing edge {0} must not have a learning rule")]
    LearningRuleCrossing(String),

    #[error("{location}: expected exactly one operator updating cell {cell}, found {found}")]
    SplitUpdateCount {
        location: String,
        cell: u64,
        found: usize,
    },

    #[error("component {component}: no operator reads transferred cell {cell}")]
    NoCrossingReader { component: usize, cell: u64 },

    #[error("unknown partition strategy: {0}")]
    UnknownStrategy(String),

    #[error("partition strategy {0} is not available in this build")]
    StrategyUnavailable(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("plan encode error: {0}")]
    PlanEncode(#[from] rmp_serde::encode::Error),

    #[error("plan decode error: {0}")]
    PlanDecode(#[from] rmp_serde::decode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
