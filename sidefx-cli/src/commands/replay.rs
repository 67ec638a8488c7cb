//! Replay command implementation.

use crate::commands::resolve_config;
use crate::reducers;
use crate::script::{Event, Script};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use sidefx_engine::prelude::*;
use sidefx_engine::MetricsSnapshot;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    pub environment: Option<Environment>,
    pub show_renders: bool,
    pub stats: bool,
}

/// One line of replay output
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Record {
    Dispatch { state: Value },
    Render { id: String, output: Value },
    Update { id: String, committed: bool },
    Peek { state: Option<Value> },
    Finalize { state: Option<Value> },
    Error { message: String },
}

/// Outcome of running a script against a manager
#[derive(Debug)]
pub struct Replay {
    pub records: Vec<Record>,
    pub metrics: MetricsSnapshot,
}

/// Replay a script and print one JSON record per line
pub fn replay_script(config_path: Option<&Path>, script_path: &Path, opts: ReplayOptions) -> Result<()> {
    let script = Script::from_file(script_path)?;
    let config = resolve_config(config_path, script.environment, opts.environment)?;
    let replay = run(&script, config, opts.show_renders)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for record in &replay.records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }

    if opts.stats {
        eprint!("{}", replay.metrics);
    }
    Ok(())
}

/// Run every event of `script` through a freshly wrapped manager
pub fn run(script: &Script, config: EngineConfig, show_renders: bool) -> Result<Replay> {
    let environment = config.environment;
    script
        .validate(environment)
        .context("Invalid script")?;

    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let spec = script.reducer.clone();

    let mut builder = SideEffect::<PropsBag, Value>::builder()
        .config(config)
        .reduce(move |props| reducers::reduce(&spec, props))
        .dispatch_client(move |state| {
            sink.lock().push(Record::Dispatch {
                state: state.clone(),
            })
        });
    if let Some(template) = script.server_template.clone() {
        builder = builder.map_server(move |state| reducers::apply_template(&template, state));
    }
    let factory = builder.build().context("Failed to build side effect")?;

    let mut unit = unit_fn(|props: &PropsBag| props.to_json());
    if let Some(label) = &script.label {
        unit = unit.labeled(label.clone());
    }
    let manager = factory.wrap(unit).context("Failed to wrap unit")?;

    tracing::info!(
        "replaying {} events through {} ({}, reducer {})",
        script.events.len(),
        manager.label(),
        environment,
        script.reducer
    );

    let mut ids: HashMap<String, InstanceId> = HashMap::new();
    for event in &script.events {
        match event {
            Event::Attach { id, props } => {
                let instance = manager.attach(props.clone());
                tracing::debug!("attached '{}' as {}", id, instance);
                ids.insert(id.clone(), instance);
                if show_renders {
                    if let Some(output) = manager.render(instance) {
                        log.lock().push(Record::Render {
                            id: id.clone(),
                            output,
                        });
                    }
                }
            }
            Event::Update { id, props } => {
                let instance = *ids
                    .get(id)
                    .with_context(|| format!("update of unknown instance '{id}'"))?;
                let committed = manager.update(instance, props.clone());
                log.lock().push(Record::Update {
                    id: id.clone(),
                    committed,
                });
                if committed && show_renders {
                    if let Some(output) = manager.render(instance) {
                        log.lock().push(Record::Render {
                            id: id.clone(),
                            output,
                        });
                    }
                }
            }
            Event::Detach(id) => {
                let instance = ids
                    .remove(id)
                    .with_context(|| format!("detach of unknown instance '{id}'"))?;
                manager.detach(instance);
            }
            Event::Peek => {
                let state = manager.peek();
                log.lock().push(Record::Peek { state });
            }
            Event::Finalize => match manager.finalize() {
                Ok(state) => {
                    ids.clear();
                    log.lock().push(Record::Finalize { state });
                }
                Err(err) => log.lock().push(Record::Error {
                    message: err.to_string(),
                }),
            },
        }
    }

    let records = std::mem::take(&mut *log.lock());
    Ok(Replay {
        records,
        metrics: manager.metrics(),
    })
}
