// src/cli/handlers/learning.rs

//! Built-ins that read the learning store: `stats`, `top`, `tips`, `level`, `next`.

use anyhow::Result;
use colored::*;
use std::io::Write;

use crate::{
    cli::dispatcher::{Console, Flow},
    constants::TARGET_KEY,
    core::input_parser::ParsedInput,
};

const STATS_LIMIT: usize = 10;
const DEFAULT_TOP: usize = 10;

pub fn handle_stats(console: &mut Console, _: &ParsedInput, out: &mut dyn Write) -> Result<Flow> {
    let mut rows: Vec<_> = console.learner.stats().iter().collect();
    if rows.is_empty() {
        writeln!(out, "{}", t!("learning.info.no_history").dimmed())?;
        return Ok(Flow::Continue);
    }
    // Stable sort keeps name order among equal counts.
    rows.sort_by(|a, b| b.1.count.cmp(&a.1.count));

    writeln!(out, "{}", t!("learning.header.stats").cyan())?;
    for (name, stats) in rows.into_iter().take(STATS_LIMIT) {
        writeln!(
            out,
            "  {}: {}",
            name.bold(),
            format!(
                t!("learning.info.stats_row"),
                count = stats.count,
                success = stats.success_count
            )
        )?;
    }
    Ok(Flow::Continue)
}

pub fn handle_top(console: &mut Console, input: &ParsedInput, out: &mut dyn Write) -> Result<Flow> {
    let n = match input.param("n") {
        None => DEFAULT_TOP,
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) => n,
            Err(_) => {
                writeln!(
                    out,
                    "{} {}",
                    "[error]".red(),
                    format!(t!("learning.error.invalid_count"), value = raw)
                )?;
                return Ok(Flow::Continue);
            }
        },
    };

    let top = console.learner.top(n);
    if top.is_empty() {
        writeln!(out, "{}", t!("learning.info.no_history").dimmed())?;
        return Ok(Flow::Continue);
    }
    for (i, (name, count)) in top.iter().enumerate() {
        writeln!(out, "  {}. {} ({})", i + 1, name.bold(), count)?;
    }
    Ok(Flow::Continue)
}

pub fn handle_tips(console: &mut Console, _: &ParsedInput, out: &mut dyn Write) -> Result<Flow> {
    writeln!(out, "{}", t!("learning.header.tips").cyan())?;
    for tip in console.learner.tips() {
        writeln!(out, "  {}", tip)?;
    }
    Ok(Flow::Continue)
}

pub fn handle_level(console: &mut Console, _: &ParsedInput, out: &mut dyn Write) -> Result<Flow> {
    let level = console.learner.skill_level().as_str().to_uppercase();
    writeln!(
        out,
        "{} {}",
        t!("learning.header.level").cyan(),
        level.bold()
    )?;
    Ok(Flow::Continue)
}

pub fn handle_next(console: &mut Console, input: &ParsedInput, out: &mut dyn Write) -> Result<Flow> {
    let Some(name) = input.param(TARGET_KEY) else {
        writeln!(out, "{} {}", "[error]".red(), t!("learning.error.next_usage"))?;
        return Ok(Flow::Continue);
    };
    let next = console
        .learner
        .suggest_next(name, console.settings.suggestion_count);
    if next.is_empty() {
        writeln!(
            out,
            "{}",
            format!(t!("learning.info.no_pattern"), name = name).dimmed()
        )?;
        return Ok(Flow::Continue);
    }
    for (i, cmd) in next.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, cmd.bold())?;
    }
    Ok(Flow::Continue)
}
