// src/cli/handlers/shortcut.rs

use anyhow::Result;
use colored::*;
use std::io::Write;

use crate::{
    cli::dispatcher::{Console, Flow},
    core::{
        gateway::{Execution, GatewayRefusal},
        input_parser::ParsedInput,
        template,
    },
    models::SkillLevel,
};

/// Runs a registered shortcut and reports the outcome.
///
/// Refusals (missing parameter, unsafe without opt-in) end the turn without touching the
/// learning store. Every other outcome, including rehearsals and failed processes, is
/// recorded and fed to the advisory rules.
pub fn handle(
    console: &mut Console,
    name: &str,
    input: &ParsedInput,
    out: &mut dyn Write,
) -> Result<Flow> {
    let Some(shortcut) = console.registry.get(name).cloned() else {
        writeln!(out, "{} {}", "[unknown]".red(), name)?;
        return Ok(Flow::Continue);
    };
    let ctx = console.gateway.context_for(&input.params);

    let execution = match console.gateway.execute(&shortcut, &ctx) {
        Ok(execution) => execution,
        Err(GatewayRefusal::MissingParameter(key)) => {
            writeln!(out, "{} {}", "[missing param]".red(), key)?;
            let needed = template::placeholders(&shortcut.template).join(", ");
            writeln!(
                out,
                "  {}",
                format!(t!("shortcut.info.parameters"), params = needed).dimmed()
            )?;
            return Ok(Flow::Continue);
        }
        Err(refusal @ GatewayRefusal::UnsafeWithoutOptIn { .. }) => {
            writeln!(out, "{} {}", "[unsafe]".red().bold(), refusal)?;
            return Ok(Flow::Continue);
        }
        Err(refusal @ GatewayRefusal::MalformedTemplate(_)) => {
            writeln!(out, "{} {}", "[error]".red(), refusal)?;
            return Ok(Flow::Continue);
        }
    };

    report_command(&execution, out)?;

    if let Err(e) = console.learner.record(name, &ctx, &execution.result) {
        log::warn!("{}", e);
        writeln!(out, "{} {}", "[warn]".yellow(), e)?;
    }

    let advice = console.advisor.suggest(name, &execution.result);
    if !advice.is_empty() {
        writeln!(out, "{}", "[suggestions]".cyan())?;
        for line in &advice {
            writeln!(out, "  - {}", line)?;
        }
    }

    if console.learner.skill_level() != SkillLevel::Beginner {
        let next = console
            .learner
            .suggest_next(name, console.settings.suggestion_count);
        if !next.is_empty() {
            writeln!(out, "{}", t!("shortcut.header.smart_suggestions").cyan())?;
            for (i, cmd) in next.iter().enumerate() {
                let desc = console
                    .registry
                    .get(cmd)
                    .map(|s| s.description.as_str())
                    .unwrap_or("");
                writeln!(out, "  {}. {}: {}", i + 1, cmd.bold(), desc)?;
            }
        }
    }

    report_output(&execution, console.settings.preview_chars, out)?;
    Ok(Flow::Continue)
}

fn report_command(execution: &Execution, out: &mut dyn Write) -> Result<()> {
    if execution.rehearsed {
        writeln!(
            out,
            "{} {}",
            "[dry-run]".yellow(),
            format!(t!("shortcut.info.not_executed"), cmd = execution.command_line)
        )?;
    } else {
        writeln!(out, "{} {}", "[exec]".green(), execution.command_line)?;
    }
    Ok(())
}

fn report_output(execution: &Execution, preview_chars: usize, out: &mut dyn Write) -> Result<()> {
    let result = &execution.result;
    if !result.stdout.is_empty() {
        let (preview, remaining) = preview(&result.stdout, preview_chars);
        writeln!(out, "\n{}", "[output]".cyan())?;
        writeln!(out, "{}", preview)?;
        if remaining > 0 {
            writeln!(
                out,
                "{}",
                format!(t!("shortcut.info.more_characters"), count = remaining).dimmed()
            )?;
        }
    }
    if !result.succeeded() {
        writeln!(
            out,
            "{}",
            format!(t!("shortcut.info.exit_code"), code = result.returncode).red()
        )?;
        if !result.stderr.is_empty() {
            writeln!(out, "{}", "[stderr]".red())?;
            writeln!(out, "{}", result.stderr.trim_end())?;
        }
    }
    Ok(())
}

/// The first `limit` characters of `text` and how many characters were left out.
fn preview(text: &str, limit: usize) -> (String, usize) {
    let total = text.chars().count();
    let shown: String = text.chars().take(limit).collect();
    (shown, total.saturating_sub(limit))
}
