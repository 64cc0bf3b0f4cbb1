//! cardflow command-line entry point.
//!
//! Binary name: `cardflow`
//!
//! Parses CLI arguments, sets up tracing, opens the data directory, then
//! dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,cardflow_core=debug,cardflow_infra=debug",
        _ => "trace",
    };

    cardflow_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions and previews don't need app state
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "cardflow", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Preview { agent, input } => {
            cli::preview::preview(agent, input.as_deref(), cli.json).await?;
            cardflow_observe::tracing_setup::shutdown_tracing();
            return Ok(());
        }
        _ => {}
    }

    let state = AppState::init(cli.data_dir.clone()).await?;

    let result = match cli.command {
        Commands::Run {
            agent,
            input,
            conversation,
            no_stream,
        } => cli::run::run(&state, &agent, input.as_deref(), conversation, no_stream, cli.json, cli.quiet).await,

        Commands::List => cli::conversation::list_conversations(&state, cli.json).await,

        Commands::Show { id } => cli::conversation::show_conversation(&state, id, cli.json).await,

        Commands::Delete { id } => cli::conversation::delete_conversation(&state, id, cli.json).await,

        Commands::Config => cli::config::show_config(&state, cli.json),

        Commands::Preview { .. } | Commands::Completions { .. } => unreachable!("handled above"),
    };

    cardflow_observe::tracing_setup::shutdown_tracing();
    result
}
