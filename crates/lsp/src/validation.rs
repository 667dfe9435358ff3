// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Validation engine
//!
//! Validates a document by splitting it into statements and running each
//! through `EXPLAIN` on the live session, sequentially. The server does
//! not understand SQL beyond the lexical split — correctness judgments
//! come from the database itself.
//!
//! A server-reported error position is a 1-based character offset into
//! the `EXPLAIN`-prefixed query text. Mapping it back to the document:
//! subtract the prefix, walk the statement's lines to find the containing
//! line and column, then extend the range forward to the next whitespace
//! (or end of line) to approximate the width of the offending token.
//! Positions that fall outside the statement are clamped, never fatal.

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};
use tracing::warn;

use postgres_sql_lsp_catalog::CatalogError;
use postgres_sql_lsp_text::splitter::{locate, Statement, StatementSplitter};

use crate::document::Document;
use crate::session_manager::SessionManager;

/// Prefix wrapped around every validated statement.
pub const EXPLAIN_PREFIX: &str = "EXPLAIN ";

/// `source` field of every diagnostic this server publishes.
pub const DIAGNOSTIC_SOURCE: &str = "postgres-sql-lsp";

/// Validate a document against the live session.
///
/// Returns the full replacement set of diagnostics for the document, or
/// `None` when no session is active (no diagnostics are produced until a
/// connection exists).
pub async fn validate_document(
    sessions: &SessionManager,
    document: &Document,
) -> Option<Vec<Diagnostic>> {
    if !sessions.has_session().await {
        return None;
    }

    let text = document.get_content();
    let mut diagnostics = Vec::new();

    for statement in StatementSplitter::new(&text) {
        if statement.text.trim().is_empty() {
            continue;
        }
        if statement.unterminated {
            diagnostics.push(error_diagnostic(
                statement_range(&statement),
                "Unterminated string, quoted identifier or block comment".to_string(),
            ));
            continue;
        }

        let sql = format!("{EXPLAIN_PREFIX}{}", statement.text);
        match sessions.run_query(&sql).await {
            // session torn down mid-run; a later pass will pick this up
            None => return None,
            Some(Ok(_)) => {}
            Some(Err(CatalogError::QueryFailed {
                message, position, ..
            })) => {
                let range = match position {
                    Some(reported) => error_range(&statement, reported),
                    None => statement_range(&statement),
                };
                diagnostics.push(error_diagnostic(range, message));
            }
            Some(Err(e)) => {
                warn!("validation query failed: {e}");
            }
        }
    }

    Some(diagnostics)
}

/// Whether diagnostics computed against `snapshot_version` may still be
/// published for the document's current state.
///
/// Validation is not cancelled by newer edits; instead the result for a
/// superseded snapshot is dropped at the publish boundary, so a slow
/// pass can never overwrite diagnostics for text the user has since
/// changed. A closed document (`None`) publishes nothing.
pub fn is_current_version(snapshot_version: i32, current: Option<&Document>) -> bool {
    matches!(current, Some(document) if document.version() == snapshot_version)
}

fn error_diagnostic(range: Range, message: String) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message,
        ..Default::default()
    }
}

/// Map a server-reported error position back into the document.
pub fn error_range(statement: &Statement, reported_position: usize) -> Range {
    // 1-based, and counted from the start of the EXPLAIN prefix
    let offset = reported_position
        .saturating_sub(1)
        .saturating_sub(EXPLAIN_PREFIX.len());

    let (line_idx, col) = locate(statement, offset);
    let line = &statement.lines[line_idx];
    let line_len = line.chars().count();

    // widen to the next whitespace to cover the offending token
    let end_col = line
        .chars()
        .skip(col)
        .position(char::is_whitespace)
        .map(|found| col + found)
        .unwrap_or(line_len);

    let col_base = if line_idx == 0 { statement.start_col } else { 0 };
    let doc_line = (statement.start_line + line_idx) as u32;
    Range {
        start: Position {
            line: doc_line,
            character: (col_base + col) as u32,
        },
        end: Position {
            line: doc_line,
            character: (col_base + end_col.max(col)) as u32,
        },
    }
}

/// The range spanned by a whole statement.
pub fn statement_range(statement: &Statement) -> Range {
    let last = statement.lines.len().saturating_sub(1);
    let last_len = statement
        .lines
        .last()
        .map(|l| l.chars().count())
        .unwrap_or(0);
    let end_col = if last == 0 {
        statement.start_col + last_len
    } else {
        last_len
    };
    Range {
        start: Position {
            line: statement.start_line as u32,
            character: statement.start_col as u32,
        },
        end: Position {
            line: (statement.start_line + last) as u32,
            character: end_col as u32,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(sql: &str) -> Statement {
        StatementSplitter::new(sql).next().expect("one statement")
    }

    #[test]
    fn test_error_range_maps_token_on_first_line() {
        // EXPLAIN SELECT * FROM nosuchtable
        // 123456789...          ^ position 23 (1-based, with prefix)
        let statement = statement("SELECT * FROM nosuchtable;");
        let range = error_range(&statement, 23);
        assert_eq!(range.start.line, 0);
        assert_eq!(range.start.character, 14);
        // widened forward to cover the token
        assert!(range.end.character >= 25);
    }

    #[test]
    fn test_error_range_crosses_lines() {
        let statement = statement("SELECT *\nFROM nosuchtable;");
        // "EXPLAIN " + "SELECT *\n" puts the table name at 1-based 23
        let range = error_range(&statement, 23);
        assert_eq!(range.start.line, 1);
        assert_eq!(range.start.character, 5);
    }

    #[test]
    fn test_error_range_respects_statement_start_column() {
        let statements: Vec<_> = StatementSplitter::new("SELECT 1;  SELECT * FROM nosuchtable;").collect();
        let second = &statements[1];
        assert_eq!(second.start_col, 11);
        let range = error_range(second, 23);
        // column 14 within the statement, shifted by its start column
        assert_eq!(range.start.character, 25);
    }

    #[test]
    fn test_error_range_clamps_out_of_bounds_position() {
        let statement = statement("SELECT 1;");
        let range = error_range(&statement, 10_000);
        assert_eq!(range.start.line, 0);
        assert!(range.start.character as usize <= statement.text.chars().count());
        assert!(range.end.character >= range.start.character);
    }

    #[test]
    fn test_error_range_stops_at_whitespace() {
        let statement = statement("SELECT nosuchcol FROM t;");
        // "EXPLAIN SELECT " is 15 chars; 1-based position 16 hits the column
        let range = error_range(&statement, 16);
        assert_eq!(range.start.character, 7);
        assert_eq!(range.end.character, 16);
    }

    #[test]
    fn test_is_current_version() {
        use tower_lsp::lsp_types::Url;

        let uri = Url::parse("file:///test.sql").unwrap();
        let mut document = Document::new(uri, "SELECT 1;".to_string(), 3, "postgres-sql".to_string());

        assert!(is_current_version(3, Some(&document)));
        assert!(!is_current_version(2, Some(&document)));
        assert!(!is_current_version(3, None));

        // an edit arriving mid-validation invalidates the snapshot
        document
            .apply_changes(
                &[tower_lsp::lsp_types::TextDocumentContentChangeEvent {
                    range: None,
                    range_length: None,
                    text: "SELECT 2;".to_string(),
                }],
                4,
            )
            .unwrap();
        assert!(!is_current_version(3, Some(&document)));
    }

    #[test]
    fn test_statement_range_single_line() {
        let statement = statement("  SELECT 1;");
        let range = statement_range(&statement);
        assert_eq!(range.start.character, 2);
        assert_eq!(range.end.character, 11);
        assert_eq!(range.end.line, 0);
    }

    #[test]
    fn test_statement_range_multi_line() {
        let statement = statement("SELECT *\nFROM t;");
        let range = statement_range(&statement);
        assert_eq!(range.start, Position { line: 0, character: 0 });
        assert_eq!(range.end, Position { line: 1, character: 7 });
    }
}
