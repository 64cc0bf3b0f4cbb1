//! CLI command definitions for the `cardflow` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod agent;
pub mod config;
pub mod conversation;
pub mod preview;
pub mod run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

/// Run card-based prompt agents against an LLM.
#[derive(Parser)]
#[command(name = "cardflow", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    /// Data directory (defaults to ~/.cardflow).
    #[arg(long, global = true, env = "CARDFLOW_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the agent comes from and how its controls are set.
#[derive(Args, Debug, Clone)]
pub struct AgentArgs {
    /// Path to the agent JSON file.
    pub file: PathBuf,

    /// Agent display name; also stands in for `{#input}` when no input is given.
    #[arg(long, default_value = "Agent")]
    pub label: String,

    /// Control override, `key=value` or `cardId.key=value` (repeatable).
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Treat the file as model output and extract the JSON config from it.
    #[arg(long)]
    pub from_model_output: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve every prompt block without calling a model.
    Preview {
        #[command(flatten)]
        agent: AgentArgs,

        /// Text substituted for `{#input}`.
        #[arg(long)]
        input: Option<String>,
    },

    /// Execute every prompt block against the configured model.
    Run {
        #[command(flatten)]
        agent: AgentArgs,

        /// Text substituted for `{#input}`.
        #[arg(long)]
        input: Option<String>,

        /// Append to an existing conversation instead of starting a new one.
        #[arg(long)]
        conversation: Option<Uuid>,

        /// Wait for each full response instead of streaming it.
        #[arg(long)]
        no_stream: bool,
    },

    /// List stored conversations, most recent first.
    #[command(alias = "ls")]
    List,

    /// Show the messages of a conversation.
    Show {
        /// Conversation id.
        id: Uuid,
    },

    /// Delete a conversation.
    #[command(alias = "rm")]
    Delete {
        /// Conversation id.
        id: Uuid,
    },

    /// Print the effective runner configuration.
    Config,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
