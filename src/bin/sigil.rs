// src/bin/sigil.rs

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use sigil::{
    cli::{Cli, dispatcher::Console, prompt},
    core::config_loader,
};
use std::env;
use std::io;

/// The entry point of `sigil`.
/// It sets up logging, resolves configuration, runs the console loop,
/// and performs centralized error handling for startup failures.
fn main() {
    env_logger::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let config = config_loader::load_config(cli.config.as_deref())?;
    let base = env::current_dir().context("Failed to determine the current directory")?;
    let resolved = config_loader::resolve_config(&config, &cli.overrides(), &base)?;
    log::debug!("Resolved configuration: {:?}", resolved);

    let mut console = Console::from_config(&resolved)?;
    let mut source = prompt::stdin_source(console.completer());
    let mut stdout = io::stdout().lock();
    console.run(source.as_mut(), &mut stdout)
}
