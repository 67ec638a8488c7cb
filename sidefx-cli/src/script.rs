//! Lifecycle scripts
//!
//! A script names a reducer and lists the attach/update/detach events an
//! embedder would deliver, interleaved with `peek` and `finalize` calls.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sidefx_types::{Environment, PropsBag};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// Label of the wrapped unit
    #[serde(default)]
    pub label: Option<String>,

    /// Overrides the configured environment
    #[serde(default)]
    pub environment: Option<Environment>,

    pub reducer: ReducerSpec,

    /// Non-interactive post-processing; `{state}` is replaced by the state
    #[serde(default)]
    pub server_template: Option<String>,

    #[serde(default)]
    pub events: Vec<Event>,
}

/// Built-in reducers over props bags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReducerSpec {
    /// Text of `key` from every instance, joined in attachment order
    Join {
        key: String,
        #[serde(default = "default_separator")]
        separator: String,
    },

    /// Value of `key` from the most recently attached instance that sets it
    Last { key: String },

    /// All bags merged in attachment order, later keys winning
    Merge,

    /// Every value of `key`, in attachment order
    Collect { key: String },
}

fn default_separator() -> String {
    String::from(" ")
}

impl fmt::Display for ReducerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReducerSpec::Join { key, separator } => write!(f, "join({key}, {separator:?})"),
            ReducerSpec::Last { key } => write!(f, "last({key})"),
            ReducerSpec::Merge => write!(f, "merge"),
            ReducerSpec::Collect { key } => write!(f, "collect({key})"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Attach {
        id: String,
        #[serde(default)]
        props: PropsBag,
    },
    Update {
        id: String,
        #[serde(default)]
        props: PropsBag,
    },
    Detach(String),
    Peek,
    Finalize,
}

impl Script {
    /// Load a script from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse script {}", path.display()))
    }

    /// Check that events follow the attach/update*/detach order per instance
    ///
    /// A non-interactive finalize ends a pass, so ids may be attached again
    /// after it.
    pub fn validate(&self, environment: Environment) -> Result<()> {
        let mut live = HashSet::new();

        for (index, event) in self.events.iter().enumerate() {
            let step = index + 1;
            match event {
                Event::Attach { id, .. } => {
                    if !live.insert(id.as_str()) {
                        bail!("event {step}: instance '{id}' is already attached");
                    }
                }
                Event::Update { id, .. } => {
                    if !live.contains(id.as_str()) {
                        bail!("event {step}: update of unknown instance '{id}'");
                    }
                }
                Event::Detach(id) => {
                    if !live.remove(id.as_str()) {
                        bail!("event {step}: detach of unknown instance '{id}'");
                    }
                }
                Event::Finalize => {
                    if !environment.is_interactive() {
                        live.clear();
                    }
                }
                Event::Peek => {}
            }
        }
        Ok(())
    }
}
