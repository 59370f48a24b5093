//! Coursegate CLI: the `coursegate` command.

mod cli;
mod commands;
mod config;
mod logging;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use config::{Config, Settings};
use tracing::debug;

fn main() {
    let cli = Cli::parse();

    let config = Config::discover(cli.config.as_deref())
        .unwrap_or_else(|e| support::fail(format!("failed to load config: {e}")));
    let settings = Settings::resolve(config, cli.catalog, cli.completions);
    logging::init(&settings.log_filter);
    debug!(
        catalog = %settings.catalog.display(),
        completions = %settings.completions.display(),
        "settings resolved"
    );

    match cli.command {
        Commands::Init { json } => commands::init::run(&settings.catalog, json),

        Commands::Item { command } => commands::item::run(command, &settings.catalog),

        Commands::Prereq { command } => commands::prereq::run(command, &settings.catalog),

        Commands::Completion { command } => {
            commands::completion::run(command, &settings.catalog, &settings.completions)
        }

        Commands::Access { command } => {
            commands::access::run(command, &settings.catalog, &settings.completions)
        }

        Commands::Check { json } => commands::check::run(&settings.catalog, json),
    }
}
