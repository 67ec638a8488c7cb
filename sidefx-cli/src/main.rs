//! # sidefx CLI
//!
//! Replays lifecycle scripts through the sidefx engine and prints the
//! dispatched, peeked and finalized states as JSON lines.

mod commands;
mod reducers;
mod script;

use clap::{Parser, Subcommand, ValueEnum};
use sidefx_types::Environment;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sidefx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to engine configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a lifecycle script
    Replay {
        /// Script file (YAML)
        script: PathBuf,

        /// Override the configured environment
        #[arg(long, value_enum)]
        environment: Option<EnvironmentArg>,

        /// Also emit the render output of attached and updated instances
        #[arg(long)]
        renders: bool,

        /// Print manager metrics to stderr when done
        #[arg(long)]
        stats: bool,
    },

    /// Check that a script's events are well ordered
    Validate {
        /// Script file (YAML)
        script: PathBuf,

        /// Override the configured environment
        #[arg(long, value_enum)]
        environment: Option<EnvironmentArg>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EnvironmentArg {
    Interactive,
    NonInteractive,
}

impl From<EnvironmentArg> for Environment {
    fn from(arg: EnvironmentArg) -> Self {
        match arg {
            EnvironmentArg::Interactive => Environment::Interactive,
            EnvironmentArg::NonInteractive => Environment::NonInteractive,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine readable
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::WARN.into()
            }),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Replay {
            script,
            environment,
            renders,
            stats,
        } => {
            let opts = commands::ReplayOptions {
                environment: environment.map(Environment::from),
                show_renders: renders,
                stats,
            };
            commands::replay_script(config, &script, opts)
        }
        Commands::Validate {
            script,
            environment,
        } => commands::validate_script(config, &script, environment.map(Environment::from)),
    }
}
