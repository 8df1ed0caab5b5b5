// src/cli/handlers/ctf.rs

//! `ctf` sub-commands over the flag notebook.
//!
//! `flag`, `capture` and `note` receive the rest of the line verbatim (see the reserved
//! command table of the input parser); the others use the structured grammar.
//! Flags may end with `challenge=<name>` and `category=<kind>`.

use anyhow::Result;
use colored::*;
use std::io::Write;

use crate::{
    cli::dispatcher::{Console, Flow},
    constants::TARGET_KEY,
    core::{
        flag_log::ExportFormat,
        input_parser::{ParsedInput, RAW_VALUE_KEY},
    },
};

pub fn handle(console: &mut Console, input: &ParsedInput, out: &mut dyn Write) -> Result<Flow> {
    let raw = input.param(RAW_VALUE_KEY).unwrap_or("");
    match input.subcommand() {
        Some("flag") | Some("capture") => match console.notebook.capture(
            raw,
            input.param("challenge"),
            input.param("category"),
        ) {
            Ok(flag) => writeln!(
                out,
                "{} {}",
                "[✓]".green(),
                format!(t!("ctf.success.captured"), id = flag.id, flag = flag.flag)
            )?,
            Err(e) => writeln!(out, "{} {}", "[✗]".red(), e)?,
        },
        Some("note") => match console.notebook.add_note(raw) {
            Ok(()) => writeln!(out, "{} {}", "[✓]".green(), t!("ctf.success.noted"))?,
            Err(e) => writeln!(out, "{} {}", "[✗]".red(), e)?,
        },
        Some("flags") => {
            let submitted_only = input.param("submitted") == Some("true");
            let flags = console.notebook.flags(submitted_only);
            if flags.is_empty() {
                writeln!(out, "{}", t!("ctf.info.no_flags").dimmed())?;
            }
            for flag in flags {
                let status = if flag.submitted {
                    t!("ctf.label.submitted").green()
                } else {
                    t!("ctf.label.pending").yellow()
                };
                let challenge = if flag.challenge.is_empty() {
                    "-"
                } else {
                    flag.challenge.as_str()
                };
                writeln!(
                    out,
                    "  {:<4} {:<36} {:<16} {:<10} {:<10} {}",
                    flag.id,
                    flag.flag,
                    challenge,
                    flag.category,
                    status,
                    flag.timestamp.dimmed()
                )?;
            }
        }
        Some("mark") => match input.param("id").or(input.param(TARGET_KEY)) {
            None => writeln!(out, "{} {}", "[✗]".red(), t!("ctf.error.mark_usage"))?,
            Some(id) => match console.notebook.mark_submitted(id) {
                Ok(flag) => writeln!(
                    out,
                    "{} {}",
                    "[✓]".green(),
                    format!(t!("ctf.success.marked"), id = flag.id)
                )?,
                Err(e) => writeln!(out, "{} {}", "[✗]".red(), e)?,
            },
        },
        Some("export") => {
            let format = input
                .param("format")
                .or(input.param(TARGET_KEY))
                .unwrap_or("json");
            let exported = format
                .parse::<ExportFormat>()
                .and_then(|format| console.notebook.export(format, console.gateway.workspace()));
            match exported {
                Ok(path) => writeln!(
                    out,
                    "{} {}",
                    "[✓]".green(),
                    format!(t!("ctf.success.exported"), path = path.display())
                )?,
                Err(e) => writeln!(out, "{} {}", "[✗]".red(), e)?,
            }
        }
        Some("stats") => {
            let summary = console.notebook.summary();
            writeln!(out, "{}", t!("ctf.header.stats").cyan())?;
            writeln!(
                out,
                "  {}",
                format!(
                    t!("ctf.info.stats"),
                    flags = summary.flags,
                    submitted = summary.submitted,
                    notes = summary.notes
                )
            )?;
        }
        Some(other) => {
            writeln!(
                out,
                "{} {}",
                "[✗]".red(),
                format!(t!("ctf.error.unknown_subcommand"), name = other)
            )?;
            writeln!(out, "{}", t!("ctf.info.available").dimmed())?;
        }
        None => writeln!(out, "{}", t!("ctf.info.available").dimmed())?,
    }
    Ok(Flow::Continue)
}
