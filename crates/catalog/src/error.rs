// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for catalog operations
//!
//! This module defines the error types used throughout the catalog layer.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur during catalog operations
///
/// `ConnectionFailed` is surfaced to the user and empties the cache;
/// `QueryFailed` is contained to the failing sub-operation and, for
/// validation queries, carries the server-reported error position so the
/// caller can map it back into the document.
#[derive(Debug, Error, Clone, Serialize)]
pub enum CatalogError {
    /// Failed to open or authenticate a database session
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// A single query failed on an open session
    #[error("Query execution failed: {message}")]
    QueryFailed {
        message: String,
        /// 1-based character offset into the failed query text, when the
        /// server reported one
        position: Option<usize>,
        /// SQLSTATE code, when available
        code: Option<String>,
    },

    /// The connection descriptor cannot be turned into session options
    #[error("Invalid connection descriptor: {0}")]
    InvalidDescriptor(String),
}

impl CatalogError {
    /// Shorthand for a positionless query failure.
    pub fn query(message: impl Into<String>) -> Self {
        CatalogError::QueryFailed {
            message: message.into(),
            position: None,
            code: None,
        }
    }
}
