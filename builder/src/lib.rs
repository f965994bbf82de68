//! Chromium clang toolchain builder library.
//!
//! This crate syncs a chromium checkout, reads the clang revision pinned in
//! its `DEPS` manifest, runs chromium's clang build script, and packages the
//! resulting installation into a reproducible `.tar.xz` archive. It is used
//! by the `chromium-toolchain` binary and can be driven programmatically.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`command`] - Subprocess abstraction and the system runner
//! - [`config`] - TOML configuration and option resolution
//! - [`error`] - Top-level error type
//! - [`git`] - Chromium checkout synchronisation
//! - [`invoker`] - External clang build invocation
//! - [`logging`] - Timestamped stderr logger
//! - [`output`] - End-of-run summary rendering
//! - [`package`] - Staging, verification, and archiving of the toolchain
//! - [`pipeline`] - End-to-end orchestration
//! - [`revision`] - Pinned clang revision extraction
//! - [`toolchain`] - Installation discovery and validation

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod git;
pub mod invoker;
pub mod logging;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod revision;
pub mod toolchain;
