// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for postgres-sql-lsp
//!
//! This crate provides common testing components:
//! - A scripted mock session and counting session factory
//! - A fixture builder for schema cache snapshots

pub mod fixtures;
pub mod mock_session;

// Re-exports for convenience
pub use fixtures::SchemaCacheBuilder;
pub use mock_session::{MockSession, MockSessionFactory};
