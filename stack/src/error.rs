use std::time::Duration;

/// Failures that halt synthesis before a template is emitted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthError {
    #[error("Logical id \"{0}\" is declared more than once")]
    DuplicateLogicalId(String),

    #[error("\"{from}\" references \"{to}\", which is neither a resource nor a parameter")]
    DanglingReference { from: String, to: String },

    #[error("Circular reference between resources: {}", .0.join(" -> "))]
    CircularReference(Vec<String>),

    #[error("No value supplied for the parameter \"{0}\"")]
    UnresolvedParameter(String),

    #[error("Value \"{value}\" of the parameter \"{name}\" does not match {pattern}")]
    InvalidParameter {
        name: String,
        value: String,
        pattern: String,
    },

    #[error(
        "Queue visibility timeout {visibility:?} must be at least {factor}x the consumer timeout {timeout:?}"
    )]
    VisibilityTimeout {
        visibility: Duration,
        timeout: Duration,
        factor: u32,
    },
}
