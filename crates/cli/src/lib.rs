//! RegLedger CLI - operator tool over a data directory
//!
//! This crate provides the CLI binary and command orchestration.

pub mod commands;
pub mod config;
pub mod context;

pub use config::RegLedgerConfig;
pub use context::AppContext;
