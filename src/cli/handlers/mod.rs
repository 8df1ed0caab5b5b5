// src/cli/handlers/mod.rs

// One module per group of console commands.

pub mod catalog;
pub mod ctf;
pub mod help;
pub mod learning;
pub mod shortcut;
