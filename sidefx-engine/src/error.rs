//! Error types raised by the engine itself
//!
//! Failures inside caller-supplied closures are never wrapped here; a panic in
//! a reducer or dispatcher unwinds through the lifecycle call that ran it.

use thiserror::Error;

/// Invalid usage detected while building a factory or wrapping a unit
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reduce function was not provided")]
    MissingReduce,

    #[error("client dispatch function was not provided")]
    MissingDispatch,

    #[error("invalid unit definition: {0}")]
    InvalidUnit(String),

    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    UnknownEnvironment(#[from] sidefx_types::ParseEnvironmentError),
}

/// Control operation invoked in the wrong execution context
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("{label}: finalize may only be called in a non-interactive environment")]
    FinalizeInInteractive { label: String },
}

/// Any error originating from the engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = PreconditionError::FinalizeInInteractive {
            label: "SideEffect(Title)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "SideEffect(Title): finalize may only be called in a non-interactive environment"
        );

        let err: Error = ConfigError::MissingReduce.into();
        assert_eq!(
            err.to_string(),
            "configuration error: reduce function was not provided"
        );
    }
}
