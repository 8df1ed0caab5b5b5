// src/constants.rs

/// The name of the directory holding sigil's configuration (inside the system config dir).
pub const CONFIG_DIR_NAME: &str = "sigil";

/// The name of the main configuration file (inside the config dir).
pub const CONFIG_FILENAME: &str = "config.toml";

/// The name of the learning-store document when `learner_db` is not configured (inside the workspace).
pub const LEARNER_DB_FILENAME: &str = "learner_db.json";

/// The name of the flag notebook document (inside the workspace).
pub const FLAG_LOG_FILENAME: &str = "ctf_data.json";

/// The extension of shortcut definition files inside `shortcuts_dir`.
pub const SHORTCUT_FILE_EXTENSION: &str = "toml";

/// Maximum number of history entries kept by the learning store. Oldest are evicted first.
pub const HISTORY_CAPACITY: usize = 3000;

/// A fuzzy match is only proposed when its score is strictly above this value.
pub const FUZZY_THRESHOLD: u8 = 60;

/// Default process timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// Default number of stdout characters shown after an execution.
pub const DEFAULT_PREVIEW_CHARS: usize = 2000;

/// Default number of learned next-command suggestions shown after an execution.
pub const DEFAULT_SUGGESTION_COUNT: usize = 3;

/// Upper bound for each captured stream of a process, in bytes.
pub const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

/// The context key an unsafe shortcut needs to be executed.
pub const FORCE_KEY: &str = "force";

/// The only value of `FORCE_KEY` that counts as an explicit opt-in.
pub const FORCE_SENTINEL: &str = "true";

/// The ambient context key that always carries the workspace path.
pub const WORKSPACE_KEY: &str = "workspace";

/// The context key a bare positional token is assigned to.
pub const TARGET_KEY: &str = "target";
