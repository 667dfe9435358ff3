// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # PostgreSQL SQL LSP - Language Server
//!
//! This crate provides the LSP server for PostgreSQL SQL documents.
//!
//! ## Overview
//!
//! The server provides:
//! - Live diagnostics: every statement is run through `EXPLAIN` on the
//!   active connection, and server-reported error positions are mapped
//!   back to document ranges
//! - Schema-aware completion driven by trigger characters (`.` and `"`)
//! - Signature help for function calls
//! - A custom `set_connection` request through which the editor switches
//!   the single active database session
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Client (VS Code, etc.)          │
//! └──────────────┬──────────────────────────┘
//!                │ LSP Protocol + set_connection
//!                ↓
//! ┌─────────────────────────────────────────┐
//! │         LSP Backend (tower-lsp)         │
//! ├─────────────────────────────────────────┤
//! │  • did_open / did_change / did_close    │
//! │  • completion / signatureHelp           │
//! └──────┬───────────────┬──────────────────┘
//!        ↓               ↓
//! ┌────────────┐  ┌───────────────────────┐
//! │  Document  │  │    Session Manager    │
//! │   Store    │  │  (session + cache)    │
//! └────────────┘  └──────────┬────────────┘
//!                            ↓
//!                 ┌─────────────────────┐
//!                 │ Validation Engine   │
//!                 │ Completion Engine   │
//!                 │ Signature Help      │
//!                 └─────────────────────┘
//! ```
//!
//! There is no SQL parser anywhere in this tree: statement segmentation
//! and cursor-context recovery are lexical (see the text crate), and
//! semantic judgments come from the live database via `EXPLAIN`.
//!
//! ## Error Handling
//!
//! The server degrades gracefully:
//! - No active connection → no diagnostics, empty completion context
//! - Connection failure → user-visible message, cache emptied
//! - Single metadata query failure → that collection is empty, the rest
//!   of the cache populates normally
//! - Unmappable error positions → clamped to the statement, never fatal

pub mod backend;
pub mod completion;
pub mod config;
pub mod document;
pub mod session_manager;
pub mod signature;
pub mod validation;

// Re-exports for convenience
pub use backend::{LspBackend, SetConnectionParams, SetConnectionResponse};
pub use completion::CompletionEngine;
pub use config::ServerSettings;
pub use document::{Document, DocumentError, DocumentMetadata, DocumentStore};
pub use session_manager::{SessionManager, SwitchOutcome};
pub use signature::signature_help;
pub use validation::{
    error_range, is_current_version, statement_range, validate_document, DIAGNOSTIC_SOURCE,
    EXPLAIN_PREFIX,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name
pub const SERVER_NAME: &str = "postgres-sql-lsp";

/// The only language id this server processes.
pub const LANGUAGE_ID: &str = "postgres-sql";
