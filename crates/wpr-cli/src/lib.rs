//! CLI library components for wp-release.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
