//! Thin command-line wrapper around the `cadview` library.
//!
//! Flags and environment variables become a [`SessionConfig`](cadview::SessionConfig),
//! each subcommand runs one session entry point, and results are printed
//! through the [`output`] envelope. Logs go to stderr; stdout carries only
//! command results.

pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod logging;
pub mod output;
