// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # PostgreSQL SQL LSP - Text Layer
//!
//! Pure lexical building blocks shared by the validation and completion
//! engines:
//!
//! - [`StatementSplitter`]: segments raw SQL text into discrete statements
//!   while tracking comment, string-literal and quoted-identifier state.
//!   No grammar is involved; this is strictly lexical segmentation.
//! - [`BackwardIterator`]: scans backward from a cursor position to recover
//!   identifiers, dotted identifier chains and call-site argument positions.
//!
//! Both operate on plain `&str` snapshots and have no dependencies, so they
//! can be exercised without a server or a database connection.

pub mod backward;
pub mod splitter;

pub use backward::{BackwardIterator, Ident, BOF};
pub use splitter::{Statement, StatementSplitter};
