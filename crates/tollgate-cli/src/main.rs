use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tollgate_core::{EngineConfig, ProfileKind};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "tollgate", version, about = "Tollgate translation profile tooling")]
struct Cli {
    /// Engine configuration file (tollgate.yaml)
    #[arg(long, short = 'c', global = true, env = "TOLLGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Tracing filter, e.g. "tollgate_engine=debug". Overrides the config's log_filter.
    #[arg(long, global = true, env = "TOLLGATE_LOG")]
    log: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate profile and scheduled rule documents.
    ///
    /// With no files, checks every document referenced by the configuration.
    Check {
        /// Profile documents, scheduled rule documents or scheduled rule lists
        files: Vec<PathBuf>,
    },

    /// List registered action types and their parameters.
    Actions {
        /// Only actions usable in this profile kind (input, output, registration, enquiry, bulk_entity_ops)
        #[arg(long)]
        kind: Option<ProfileKind>,
    },

    /// Run a profile over a JSON context and print the result.
    Translate {
        /// Profile document path, or the name of a profile loaded from the configuration
        #[arg(long, required_unless_present = "default_output")]
        profile: Option<String>,

        /// JSON file holding the translation context
        #[arg(long)]
        context: PathBuf,

        /// Use the synthesized default output profile
        #[arg(long, default_value_t = false, conflicts_with = "profile")]
        default_output: bool,
    },

    /// Run a scheduled rule over a directory snapshot.
    Bulk {
        /// Scheduled rule document, or the id of a rule in the configured rules file
        #[arg(long)]
        rule: String,

        /// JSON directory snapshot
        #[arg(long)]
        directory: PathBuf,

        /// Write the resulting directory back to the snapshot file
        #[arg(long, default_value_t = false)]
        write: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Some(
            EngineConfig::load_with_context(path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        ),
        None => None,
    };

    let filter = cli
        .log
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.log_filter.clone()))
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Check { files } => commands::check::run(config.as_ref(), &files)?,
        Command::Actions { kind } => commands::actions::run(kind)?,
        Command::Translate {
            profile,
            context,
            default_output,
        } => commands::translate::run(config.as_ref(), profile.as_deref(), &context, default_output)?,
        Command::Bulk {
            rule,
            directory,
            write,
        } => commands::bulk::run(config.as_ref(), &rule, &directory, write)?,
    }

    Ok(())
}
