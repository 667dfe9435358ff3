// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # PostgreSQL SQL LSP - Catalog Layer
//!
//! This crate owns everything that touches the database:
//!
//! - [`ConnectionDescriptor`]: the typed connection parameters delivered
//!   with every `set_connection` request
//! - [`SqlSession`] / [`PgSession`]: the narrow session interface and its
//!   live single-connection implementation
//! - [`SqlQueries`]: the version-dispatched metadata query table
//! - [`SchemaCache`] / [`CacheBuilder`]: the schema metadata snapshot and
//!   the partial-degradation rebuild that produces it
//!
//! ## Degradation model
//!
//! A failed connection empties the cache and surfaces a
//! [`CatalogError::ConnectionFailed`]. A failed *metadata query* on a
//! working connection is contained: that one collection comes back empty
//! and the others populate normally, because reduced privileges on one
//! catalog should not blank out completion entirely.

pub mod cache;
pub mod descriptor;
pub mod error;
pub mod queries;
pub mod session;

// Re-exports
pub use cache::{CacheBuilder, ColumnInfo, FunctionInfo, FunctionOverload, SchemaCache, TableInfo};
pub use descriptor::{quoted_ident, ConnectionDescriptor, DEFAULT_PORT};
pub use error::{CatalogError, CatalogResult};
pub use queries::{QueryOverrides, SqlQueries};
pub use session::{FieldInfo, PgSession, PgSessionFactory, QueryResult, SessionFactory, SqlSession};

/// Schema used for unqualified lookups when none is configured.
pub const DEFAULT_SCHEMA: &str = "public";
