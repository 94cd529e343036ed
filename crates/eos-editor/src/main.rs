//! Eos item metadata editor
//!
//! Interactive CLI for inspecting and editing the `eos` metadata
//! namespace on items over the host REST API.

mod menu;
mod model;
mod rest;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rest::RestClient;

/// The master group has no host-side discovery endpoint, so the editor
/// takes it as a flag with the conventional name as default
const DEFAULT_MASTER_GROUP: &str = "gEos";

#[derive(Parser)]
#[command(name = "eos-editor", version, about = "Eos item metadata editor")]
struct Cli {
    /// openHAB server address, like "localhost:8080"
    #[arg(short = 's', long, global = true, default_value = "localhost:8080")]
    openhab_host: String,

    /// Defaults to interactive mode when no command is given
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive editing of all lights in Eos
    Live {
        /// Group to start browsing from
        #[arg(long, default_value = DEFAULT_MASTER_GROUP)]
        master_group: String,
    },
    /// Edit a single light
    Edit {
        /// Name of the item to edit
        item: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let client = RestClient::new(&cli.openhab_host);
    client
        .ping()
        .with_context(|| format!("cannot reach openHAB at '{}'", cli.openhab_host))?;

    match cli.command.unwrap_or(Command::Live {
        master_group: DEFAULT_MASTER_GROUP.to_string(),
    }) {
        Command::Live { master_group } => menu::browse_group(&client, &master_group),
        Command::Edit { item } => menu::edit_light(&client, &item),
    }
}
