//! Data models shared by the pipeline and the CLI.

pub mod config;
pub mod document;
