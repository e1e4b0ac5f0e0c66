//! # Chat Library
//!
//! Read-only browser for archived role-play chat backups.
//!
//! An archive is a set of directory trees (backup copies, memory cards, live
//! application data) that hold per-character chat transcripts and images.
//! The library discovers those trees, merges them into one catalog keyed by
//! character, and serves sanitized transcripts and image listings through a
//! CLI and a JSON HTTP API.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │  roots   │──▶│ scanner  │──▶│ library  │──▶│ CLI/HTTP │
//! │ discover │   │ + merge  │   │  facade  │   │          │
//! └──────────┘   └──────────┘   └────┬─────┘   └──────────┘
//!                                    │
//!                          ┌─────────┴─────────┐
//!                          ▼                   ▼
//!                     ┌──────────┐       ┌──────────┐
//!                     │  parser  │──────▶│ sanitize │
//!                     └──────────┘       └──────────┘
//! ```
//!
//! Nothing is cached: every query re-reads the archive.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`probe`] | Symlink-following filesystem probes |
//! | [`roots`] | Archive root discovery |
//! | [`identity`] | Fuzzy character-name matching |
//! | [`scanner`] | Per-root walks and priority merge |
//! | [`parser`] | Line-delimited JSON transcript decoding |
//! | [`sanitize`] | Removal of generation artifacts from message bodies |
//! | [`models`] | Core data types |
//! | [`library`] | Query facade |
//! | [`error`] | Errors surfaced to callers |
//! | [`config`] | TOML configuration and environment overrides |
//! | [`logging`] | tracing subscriber setup |
//! | [`server`] | HTTP API |
//! | [`commands`] | CLI entry points |

pub mod commands;
pub mod config;
pub mod error;
pub mod identity;
pub mod library;
pub mod logging;
pub mod models;
pub mod parser;
pub mod probe;
pub mod roots;
pub mod sanitize;
pub mod scanner;
pub mod server;
