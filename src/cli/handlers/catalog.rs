// src/cli/handlers/catalog.rs

use anyhow::Result;
use colored::*;
use std::io::Write;

use crate::{
    cli::dispatcher::{Console, Flow},
    core::input_parser::ParsedInput,
};

/// Lists shortcuts sorted by name, optionally only those carrying `tag=<tag>`.
pub fn handle(console: &mut Console, input: &ParsedInput, out: &mut dyn Write) -> Result<Flow> {
    let tag = input.param("tag");
    let shortcuts: Vec<_> = console
        .registry
        .iter()
        .filter(|s| tag.is_none_or(|t| s.tags.contains(t)))
        .collect();

    if shortcuts.is_empty() {
        writeln!(out, "{}", t!("catalog.info.empty").dimmed())?;
        return Ok(Flow::Continue);
    }

    let width = shortcuts.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for shortcut in shortcuts {
        let marker = if shortcut.safe { " " } else { "!" };
        writeln!(
            out,
            "{} {:<width$}  {}",
            marker.red().bold(),
            shortcut.name.cyan(),
            shortcut.description,
            width = width
        )?;
    }
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use crate::cli::dispatcher::tests::{console, run_line, shortcut};

    #[test]
    fn test_lists_all_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut console, _) = console(tmp.path(), true, "");
        let out = run_line(&mut console, "shortcuts");
        let full = out.find("enum-full").unwrap();
        let web = out.find("enum-web").unwrap();
        let wipe = out.find("wipe-logs").unwrap();
        assert!(full < web && web < wipe);
    }

    #[test]
    fn test_tag_filter() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut console, _) = console(tmp.path(), true, "");
        let mut loot = shortcut("dump-hashes", "secretsdump {target}", false);
        loot.tags = ["post".to_string()].into_iter().collect();
        console.registry.insert(loot);

        let out = run_line(&mut console, "ls tag=post");
        assert!(out.contains("dump-hashes"));
        assert!(!out.contains("enum-full"));
    }
}
