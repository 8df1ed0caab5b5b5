// src/core/learner.rs

//! # Learning Store
//!
//! Persists execution history and per-command counters, and derives everything else
//! (skill level, transition table, next-command suggestions) from the history.
//!
//! The whole document is rewritten atomically after each recorded execution. A missing,
//! blank or corrupted document never stops the console: the store starts empty instead.

use crate::{
    constants::HISTORY_CAPACITY,
    core::persist::{self, PersistError},
    models::{CommandStats, ExecutionContext, ExecutionResult, HistoryEntry, LearnerData, SkillLevel},
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to persist the learning store to '{path}': {source}")]
    Persistence {
        path: String,
        #[source]
        source: PersistError,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Successor counts for one command, in order of first encounter.
pub type TransitionRow = Vec<(String, u64)>;

static BEGINNER_TIPS: [&str; 4] = [
    t!("tips.beginner.1"),
    t!("tips.beginner.2"),
    t!("tips.beginner.3"),
    t!("tips.beginner.4"),
];
static INTERMEDIATE_TIPS: [&str; 4] = [
    t!("tips.intermediate.1"),
    t!("tips.intermediate.2"),
    t!("tips.intermediate.3"),
    t!("tips.intermediate.4"),
];
static ADVANCED_TIPS: [&str; 4] = [
    t!("tips.advanced.1"),
    t!("tips.advanced.2"),
    t!("tips.advanced.3"),
    t!("tips.advanced.4"),
];
static EXPERT_TIPS: [&str; 4] = [
    t!("tips.expert.1"),
    t!("tips.expert.2"),
    t!("tips.expert.3"),
    t!("tips.expert.4"),
];

#[derive(Debug)]
pub struct LearningStore {
    /// `None` keeps the store in memory only.
    path: Option<PathBuf>,
    data: LearnerData,
}

impl LearningStore {
    /// Opens the store at `path`. Never fails: unreadable or malformed documents are
    /// reported and replaced by an empty store.
    pub fn load(path: &Path) -> Self {
        let data = match persist::read_json::<LearnerData>(path) {
            Ok(Some(data)) => data,
            Ok(None) => {
                log::debug!("No learning store at '{}', starting fresh.", path.display());
                LearnerData::default()
            }
            Err(e) => {
                log::warn!(
                    "Learning store '{}' is unreadable, starting fresh: {}",
                    path.display(),
                    e
                );
                LearnerData::default()
            }
        };

        let mut store = Self {
            path: Some(path.to_path_buf()),
            data,
        };
        store.refresh_level();
        store
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: LearnerData::default(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Appends one execution, updates its counters and rewrites the document.
    ///
    /// The in-memory state is updated even when the write fails, so the caller may
    /// report the error and carry on.
    pub fn record(
        &mut self,
        command: &str,
        context: &ExecutionContext,
        result: &ExecutionResult,
    ) -> StoreResult<()> {
        let now = now_secs();
        self.data.history.push(HistoryEntry {
            command: command.to_string(),
            context: context.clone(),
            result: Some(result.clone()),
            timestamp: now,
        });

        let stats = self.data.stats.entry(command.to_string()).or_default();
        stats.count += 1;
        if result.succeeded() {
            stats.success_count += 1;
        }
        stats.last_used = Some(now);

        let overflow = self.data.history.len().saturating_sub(HISTORY_CAPACITY);
        if overflow > 0 {
            self.data.history.drain(..overflow);
        }

        self.refresh_level();
        self.flush()
    }

    /// Writes the current state, including a fresh copy of the transition table.
    pub fn flush(&mut self) -> StoreResult<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        self.data.patterns = self
            .transitions()
            .into_iter()
            .map(|(from, row)| (from, row.into_iter().collect()))
            .collect();

        persist::write_json_atomic(&path, &self.data).map_err(|source| StoreError::Persistence {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.data.history
    }

    /// Cumulative per-command counters. These survive history trimming.
    pub fn stats(&self) -> &BTreeMap<String, CommandStats> {
        &self.data.stats
    }

    pub fn skill_level(&self) -> SkillLevel {
        self.data.learning_level
    }

    /// Counts of `A` immediately followed by `B` over the current history.
    /// Rows keep their successors in order of first encounter.
    pub fn transitions(&self) -> BTreeMap<String, TransitionRow> {
        let mut table: BTreeMap<String, TransitionRow> = BTreeMap::new();
        for pair in self.data.history.windows(2) {
            let [current, next] = pair else { continue };
            let row = table.entry(current.command.clone()).or_default();
            match row.iter_mut().find(|(name, _)| *name == next.command) {
                Some((_, count)) => *count += 1,
                None => row.push((next.command.clone(), 1)),
            }
        }
        table
    }

    /// Up to `n` commands that most often followed `command`. Ties keep first-encounter order.
    pub fn suggest_next(&self, command: &str, n: usize) -> Vec<String> {
        let mut row = self.transitions().remove(command).unwrap_or_default();
        row.sort_by(|a, b| b.1.cmp(&a.1));
        row.into_iter().take(n).map(|(name, _)| name).collect()
    }

    /// The `n` most frequent commands of the current history. Ties keep first-seen order.
    pub fn top(&self, n: usize) -> Vec<(String, u64)> {
        let mut counts: Vec<(String, u64)> = Vec::new();
        for entry in &self.data.history {
            match counts.iter_mut().find(|(name, _)| *name == entry.command) {
                Some((_, count)) => *count += 1,
                None => counts.push((entry.command.clone(), 1)),
            }
        }
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(n);
        counts
    }

    pub fn tips(&self) -> &'static [&'static str] {
        match self.skill_level() {
            SkillLevel::Beginner => &BEGINNER_TIPS,
            SkillLevel::Intermediate => &INTERMEDIATE_TIPS,
            SkillLevel::Advanced => &ADVANCED_TIPS,
            SkillLevel::Expert => &EXPERT_TIPS,
        }
    }

    fn refresh_level(&mut self) {
        let unique: BTreeSet<&str> = self
            .data
            .history
            .iter()
            .map(|h| h.command.as_str())
            .collect();
        self.data.learning_level = SkillLevel::classify(self.data.history.len(), unique.len());
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}
