// src/core/advisor.rs

//! # Advisory Engine
//!
//! A fixed table of rules keyed by shortcut name. After an execution, the rule for that
//! shortcut (if any) inspects the result and proposes follow-up shortcuts.

use crate::{core::registry::ShortcutRegistry, models::ExecutionResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::{collections::BTreeMap, fs, path::Path};
use thiserror::Error;

lazy_static! {
    static ref WEB_PORT_RE: Regex =
        Regex::new(r"\b(80|443|8080|8443)/tcp\b").expect("web port pattern is valid");
    static ref HYDRA_HIT_RE: Regex =
        Regex::new(r"login:\s*(\S+)\s+password:\s*(\S+)").expect("hydra pattern is valid");
}

#[derive(Error, Debug)]
pub enum AdvisoryError {
    #[error("Could not read artifact '{path}': {source}")]
    Artifact {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

type RuleFn = fn(&ExecutionResult) -> Result<Vec<String>, AdvisoryError>;

/// Binds one shortcut name to its rule.
#[derive(Debug)]
pub struct AdvisoryRule {
    pub shortcut: &'static str,
    pub rule: RuleFn,
}

/// The single source of truth for advisory rules.
pub static ADVISORY_RULES: &[AdvisoryRule] = &[
    AdvisoryRule {
        shortcut: "enum-full",
        rule: rule_enum_full,
    },
    AdvisoryRule {
        shortcut: "enum-web",
        rule: rule_enum_web,
    },
    AdvisoryRule {
        shortcut: "brute-ssh",
        rule: rule_brute_ssh,
    },
];

#[derive(Debug, Clone)]
pub struct Advisor {
    rules: BTreeMap<&'static str, RuleFn>,
}

impl Default for Advisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Advisor {
    pub fn new() -> Self {
        Self {
            rules: ADVISORY_RULES
                .iter()
                .map(|entry| (entry.shortcut, entry.rule))
                .collect(),
        }
    }

    /// Returns the rule names that have no matching shortcut in `registry`.
    /// Such rules can never fire; they are reported once at startup.
    pub fn unbound_rules(&self, registry: &ShortcutRegistry) -> Vec<&'static str> {
        self.rules
            .keys()
            .copied()
            .filter(|name| !registry.contains(name))
            .collect()
    }

    pub fn has_rule(&self, shortcut: &str) -> bool {
        self.rules.contains_key(shortcut)
    }

    /// Runs the rule for `shortcut`. Unmapped shortcuts yield `Ok(vec![])`.
    pub fn evaluate(
        &self,
        shortcut: &str,
        result: &ExecutionResult,
    ) -> Result<Vec<String>, AdvisoryError> {
        match self.rules.get(shortcut) {
            Some(rule) => rule(result),
            None => Ok(Vec::new()),
        }
    }

    /// Like `evaluate`, but a failing rule degrades to no suggestions.
    pub fn suggest(&self, shortcut: &str, result: &ExecutionResult) -> Vec<String> {
        self.evaluate(shortcut, result).unwrap_or_else(|e| {
            log::debug!("Advisory rule for '{}' failed: {}", shortcut, e);
            Vec::new()
        })
    }
}

// --- Rules ---

fn rule_enum_full(res: &ExecutionResult) -> Result<Vec<String>, AdvisoryError> {
    let out = format!("{}{}", res.stdout, res.stderr);
    let lower = out.to_lowercase();
    let mut suggestions = Vec::new();

    if out.contains("3306") || lower.contains("mysql") {
        suggestions.push("Detected MySQL. Try: enum-db target=<host>".to_string());
    }
    if WEB_PORT_RE.is_match(&out) || lower.contains("http") {
        suggestions.push("Detected web ports. Try: enum-web target=<host>".to_string());
    }
    if out.contains("22/tcp") {
        suggestions.push(
            "SSH detected. Check for weak credentials or unusual banners (brute-ssh).".to_string(),
        );
    }
    Ok(suggestions)
}

fn rule_enum_web(res: &ExecutionResult) -> Result<Vec<String>, AdvisoryError> {
    let mut suggestions = Vec::new();
    let from_gobuster = |artifact: &&String| {
        Path::new(artifact.as_str())
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains("gobuster"))
    };
    for artifact in res.artifacts.iter().filter(from_gobuster) {
        let found = count_entries(Path::new(artifact))?;
        suggestions.push(format!(
            "Found {} path(s) via gobuster → inspect {}",
            found, artifact
        ));
    }
    Ok(suggestions)
}

fn rule_brute_ssh(res: &ExecutionResult) -> Result<Vec<String>, AdvisoryError> {
    Ok(HYDRA_HIT_RE
        .captures_iter(&res.stdout)
        .filter_map(|caps| caps.get(1).map(|login| login.as_str().to_string()))
        .map(|login| format!("Valid credentials for '{}'. Try: ssh {}@<host>", login, login))
        .collect())
}

/// Non-blank lines of a tool output file.
fn count_entries(path: &Path) -> Result<usize, AdvisoryError> {
    let content = fs::read_to_string(path).map_err(|source| AdvisoryError::Artifact {
        path: path.display().to_string(),
        source,
    })?;
    Ok(content.lines().filter(|l| !l.trim().is_empty()).count())
}
