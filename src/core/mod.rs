// src/core/mod.rs

pub mod advisor;
pub mod config_loader;
pub mod flag_log;
pub mod fuzzy;
pub mod gateway;
pub mod input_parser;
pub mod learner;
pub mod paths;
pub mod persist;
pub mod registry;
pub mod template;
