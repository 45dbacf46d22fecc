use thiserror::Error;

/// Rejected strategy configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("option {name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("option {name} expects a {expected} value")]
    TypeMismatch { name: String, expected: &'static str },
    #[error("option {name} has no choice named {choice}")]
    UnknownChoice { name: String, choice: String },
    #[error("no heuristic registered under {0}")]
    UnknownHeuristic(String),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
    #[error("failed to parse strategy config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Broken search invariants. These abort a single worker task, never the
/// whole decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("search tree has no node {0}")]
    MissingNode(usize),
    #[error("search task panicked: {0}")]
    TaskPanicked(String),
}
