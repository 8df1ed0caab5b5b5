// src/cli/mod.rs

use clap::Parser;
use std::path::PathBuf;

use crate::core::config_loader::ConfigOverrides;

pub mod dispatcher;
pub mod handlers;
pub mod prompt;

/// Builds the color-aware help text at runtime.
fn build_help_string() -> &'static str {
    let use_colors = colored::control::SHOULD_COLORIZE.should_colorize();
    let template = t!("cli.help.template");

    let title = if use_colors { "\x1b[1;33m" } else { "" }; // Bold Yellow
    let hl = if use_colors { "\x1b[1;36m" } else { "" }; // Bold Cyan
    let cmd = if use_colors { "\x1b[36m" } else { "" }; // Cyan
    let err = if use_colors { "\x1b[91m" } else { "" }; // Bright Red
    let dim = if use_colors { "\x1b[2m" } else { "" };
    let reset = if use_colors { "\x1b[0m" } else { "" };

    let formatted_string = template
        .replace("<title>", title)
        .replace("</title>", reset)
        .replace("<hl>", hl)
        .replace("</hl>", reset)
        .replace("<cmd>", cmd)
        .replace("</cmd>", reset)
        .replace("<err>", err)
        .replace("</err>", reset)
        .replace("<dim>", dim)
        .replace("</dim>", reset);

    Box::leak(formatted_string.into_boxed_str())
}

/// sigil: an operator console for parameterized shell shortcuts that learns your workflow.
#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about,
    help_template = { build_help_string() },
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory where tools write their output (exposed to templates as {workspace}).
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<String>,

    /// Directory holding the shortcut definition files.
    #[arg(long = "shortcuts", value_name = "DIR")]
    pub shortcuts_dir: Option<String>,

    /// Rehearse only: print commands without running them.
    #[arg(long, conflicts_with = "live")]
    pub dry_run: bool,

    /// Run commands for real.
    #[arg(long)]
    pub live: bool,

    /// Process timeout, in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl Cli {
    /// The part of the configuration the command line overrides.
    pub fn overrides(&self) -> ConfigOverrides {
        let dry_run = if self.dry_run {
            Some(true)
        } else if self.live {
            Some(false)
        } else {
            None
        };
        ConfigOverrides {
            workspace: self.workspace.clone(),
            shortcuts_dir: self.shortcuts_dir.clone(),
            dry_run,
            timeout_secs: self.timeout,
        }
    }
}
