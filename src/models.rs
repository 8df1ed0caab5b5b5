// src/models.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_PREVIEW_CHARS, DEFAULT_SUGGESTION_COUNT, DEFAULT_TIMEOUT_SECS, WORKSPACE_KEY,
};

// --- SHORTCUT MODELS ---

/// A shortcut as it is written in a definition file.
/// Only used for deserializing; the registry converts it into a `Shortcut`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ShortcutDef {
    /// Required for `[[shortcuts]]` entries; defaults to the table key for named tables.
    pub name: Option<String>,
    pub cmd: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default = "default_true")]
    pub safe: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

fn default_true() -> bool {
    true
}

/// The two layouts accepted for a shortcut definition file.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ShortcutFile {
    /// `[[shortcuts]]` array of tables.
    List { shortcuts: Vec<ShortcutDef> },
    /// `[enum-full]` tables keyed by shortcut name.
    Named(BTreeMap<String, ShortcutDef>),
}

/// A named, parameterized command template. Immutable once loaded into the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    pub name: String,
    pub template: String,
    pub description: String,
    pub safe: bool,
    pub tags: BTreeSet<String>,
    pub notes: Option<String>,
}

// --- EXECUTION MODELS ---

/// Parameter name to value mapping used to bind a template.
/// Always carries the ambient `workspace` key once built by `with_workspace`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ExecutionContext(BTreeMap<String, String>);

impl ExecutionContext {
    /// Creates a context holding only the ambient workspace path.
    pub fn with_workspace(workspace: &str) -> Self {
        let mut values = BTreeMap::new();
        values.insert(WORKSPACE_KEY.to_string(), workspace.to_string());
        Self(values)
    }

    /// Merges parsed parameters over the ambient defaults. Parsed values win.
    pub fn merged(mut self, params: &BTreeMap<String, String>) -> Self {
        for (key, value) in params {
            self.0.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

/// The outcome of one execution attempt. Produced once and never mutated afterwards.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ExecutionResult {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
    pub artifacts: Vec<String>,
}

impl ExecutionResult {
    /// The result of a command that never ran (dry-run mode).
    pub fn rehearsal() -> Self {
        Self::default()
    }

    /// A failure that happened before or around the process (timeout, spawn error).
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            returncode: -1,
            stderr: message.into(),
            ..Self::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.returncode == 0
    }
}

// --- LEARNING STORE MODELS ---

/// One executed command as kept in the learning-store history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    #[serde(rename = "cmd")]
    pub command: String,
    #[serde(rename = "ctx", default)]
    pub context: ExecutionContext,
    #[serde(default)]
    pub result: Option<ExecutionResult>,
    /// Seconds since the Unix epoch. `0.0` when the document omitted it.
    #[serde(default)]
    pub timestamp: f64,
}

/// Per-command counters, updated on every recorded execution.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CommandStats {
    #[serde(default)]
    pub count: u64,
    #[serde(rename = "success", default)]
    pub success_count: u64,
    #[serde(default)]
    pub last_used: Option<f64>,
}

/// A coarse classification of operator experience.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl SkillLevel {
    /// Classifies an operator from history volume and command diversity.
    ///
    /// The branches are evaluated in order. A long history with little diversity
    /// (e.g. 60 entries over 4 commands) falls through to `Expert`.
    pub fn classify(total: usize, unique: usize) -> Self {
        if total < 10 {
            Self::Beginner
        } else if total < 50 && unique >= 5 {
            Self::Intermediate
        } else if total >= 50 && unique >= 10 {
            Self::Advanced
        } else {
            Self::Expert
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted learning-store document. Every key is optional on load.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LearnerData {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub stats: BTreeMap<String, CommandStats>,
    /// Derived transition table, written for inspection only. History is the source of truth.
    #[serde(default)]
    pub patterns: BTreeMap<String, BTreeMap<String, u64>>,
    /// Kept as written; older documents hold an object here, newer ones a list.
    #[serde(default = "empty_json_object")]
    pub favorite_commands: serde_json::Value,
    #[serde(default)]
    pub learning_level: SkillLevel,
}

fn empty_json_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Default for LearnerData {
    fn default() -> Self {
        Self {
            history: Vec::new(),
            stats: BTreeMap::new(),
            patterns: BTreeMap::new(),
            favorite_commands: empty_json_object(),
            learning_level: SkillLevel::default(),
        }
    }
}

// --- FLAG NOTEBOOK MODELS ---

/// A flag captured during a CTF session, stored exactly as typed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CapturedFlag {
    pub id: u64,
    pub flag: String,
    #[serde(default)]
    pub challenge: String,
    #[serde(default = "default_flag_category")]
    pub category: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    #[serde(default)]
    pub submitted: bool,
}

pub fn default_flag_category() -> String {
    "manual".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FlagNote {
    pub text: String,
    pub timestamp: String,
}

/// The persisted flag notebook document.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FlagNotebookData {
    /// Keyed by the decimal flag id.
    #[serde(default)]
    pub captured_flags: BTreeMap<String, CapturedFlag>,
    #[serde(default)]
    pub notes: Vec<FlagNote>,
}

// --- CONFIGURATION MODELS ---

/// Represents the deserialized structure of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub workspace: String,
    pub shortcuts_dir: String,
    /// Defaults to `<workspace>/learner_db.json` when absent.
    pub learner_db: Option<String>,
    pub default_dry_run: bool,
    pub require_force_for_unsafe: bool,
    /// Seconds.
    pub default_timeout: u64,
    pub output_preview_chars: usize,
    pub suggestion_count: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: "./reports".to_string(),
            shortcuts_dir: "./shortcuts".to_string(),
            learner_db: None,
            default_dry_run: true,
            require_force_for_unsafe: true,
            default_timeout: DEFAULT_TIMEOUT_SECS,
            output_preview_chars: DEFAULT_PREVIEW_CHARS,
            suggestion_count: DEFAULT_SUGGESTION_COUNT,
        }
    }
}

/// Configuration with every path expanded and made absolute where possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub workspace: PathBuf,
    pub shortcuts_dir: PathBuf,
    pub learner_db: PathBuf,
    pub dry_run: bool,
    pub require_force_for_unsafe: bool,
    pub timeout_secs: u64,
    pub output_preview_chars: usize,
    pub suggestion_count: usize,
}
