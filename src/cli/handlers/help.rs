// src/cli/handlers/help.rs

use anyhow::Result;
use colored::*;
use std::io::Write;

use crate::{
    cli::dispatcher::{Console, Flow},
    constants::TARGET_KEY,
    core::{fuzzy, input_parser::ParsedInput},
    models::Shortcut,
};

/// `help` prints the console overview; `help <shortcut>` details one shortcut.
pub fn handle(console: &mut Console, input: &ParsedInput, out: &mut dyn Write) -> Result<Flow> {
    match input.param(TARGET_KEY) {
        None => print_overview(out)?,
        Some(name) => match console.registry.get(name) {
            Some(shortcut) => print_shortcut(shortcut, out)?,
            None => match fuzzy::propose(name, console.registry.names()) {
                Some(found) => writeln!(
                    out,
                    "{} {}",
                    "[did you mean]".yellow(),
                    format!(
                        t!("help.did_you_mean"),
                        name = found.name,
                        score = found.score
                    )
                )?,
                None => writeln!(out, "{} {}", "[unknown shortcut]".red(), name)?,
            },
        },
    }
    Ok(Flow::Continue)
}

fn print_overview(out: &mut dyn Write) -> Result<()> {
    writeln!(out, "\n{}", t!("help.header").yellow().bold())?;
    let entries = [
        ("help [shortcut]", t!("help.builtin.help")),
        ("shortcuts [tag=<tag>]", t!("help.builtin.shortcuts")),
        ("stats", t!("help.builtin.stats")),
        ("top [n=<count>]", t!("help.builtin.top")),
        ("tips", t!("help.builtin.tips")),
        ("level", t!("help.builtin.level")),
        ("next <shortcut>", t!("help.builtin.next")),
        ("ctf <flag|note|flags|mark|stats>", t!("help.builtin.ctf")),
        ("exit | quit", t!("help.builtin.exit")),
    ];
    for (usage, description) in entries {
        writeln!(out, "  {:<34} {}", usage.cyan(), description)?;
    }
    writeln!(out, "\n{}", t!("help.usage").dimmed())?;
    Ok(())
}

fn print_shortcut(shortcut: &Shortcut, out: &mut dyn Write) -> Result<()> {
    let description = if shortcut.description.is_empty() {
        t!("help.label.no_description")
    } else {
        shortcut.description.as_str()
    };
    let safety = if shortcut.safe {
        t!("help.label.safe_yes").green()
    } else {
        t!("help.label.safe_no").red()
    };

    writeln!(out, "\n{} {}", t!("help.label.shortcut"), shortcut.name.yellow())?;
    writeln!(out, "  {:<12} {}", t!("help.label.description"), description)?;
    writeln!(out, "  {:<12} {}", t!("help.label.command"), shortcut.template)?;
    writeln!(out, "  {:<12} {}", t!("help.label.safe"), safety)?;
    if !shortcut.tags.is_empty() {
        let tags: Vec<&str> = shortcut.tags.iter().map(String::as_str).collect();
        writeln!(out, "  {:<12} {}", t!("help.label.tags"), tags.join(", "))?;
    }
    if let Some(notes) = &shortcut.notes {
        writeln!(out, "  {:<12} {}", t!("help.label.notes"), notes)?;
    }
    writeln!(out)?;
    Ok(())
}
