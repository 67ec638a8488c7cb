//! Shared types for sidefx
//!
//! This crate provides the data every other sidefx crate speaks: props bags
//! contributed by mounted instances, instance identifiers, the execution
//! environment flag, and the one-level structural equality used to decide
//! whether an update is a no-op.

mod props;
mod shallow;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use props::{PropValue, PropsBag};
pub use shallow::{shallow_equal, PropsMap, ShallowEq};

/// Identity of one live registration inside a manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

impl InstanceId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for InstanceId {
    fn from(id: u64) -> Self {
        InstanceId(id)
    }
}

impl From<InstanceId> for u64 {
    fn from(id: InstanceId) -> Self {
        id.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Execution context a manager runs in
///
/// Interactive contexts live indefinitely and hand every state to the client
/// dispatch function. Non-interactive contexts (one server-side pass) keep the
/// state for `peek`/`finalize` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Interactive,
    NonInteractive,
}

impl Environment {
    pub fn is_interactive(self) -> bool {
        matches!(self, Environment::Interactive)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Interactive => write!(f, "interactive"),
            Environment::NonInteractive => write!(f, "non_interactive"),
        }
    }
}

/// Error returned when parsing an [`Environment`] from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown environment: {0} (expected interactive or non_interactive)")]
pub struct ParseEnvironmentError(pub String);

impl FromStr for Environment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interactive" | "client" => Ok(Environment::Interactive),
            "non_interactive" | "non-interactive" | "server" => Ok(Environment::NonInteractive),
            other => Err(ParseEnvironmentError(other.to_string())),
        }
    }
}
