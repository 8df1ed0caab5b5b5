//! # System Interaction Layer
//!
//! The boundary between the console's core logic and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: the `ProcessRunner` primitive and its shell-backed implementation.
//!   Spawns one shell-interpreted command, drains its output streams and enforces a timeout.

pub mod executor;
