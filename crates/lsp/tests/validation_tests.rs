// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Validation engine tests against a scripted session.

use std::sync::Arc;

use tower_lsp::lsp_types::Url;

use postgres_sql_lsp_catalog::{CatalogError, ConnectionDescriptor};
use postgres_sql_lsp_lsp::document::Document;
use postgres_sql_lsp_lsp::session_manager::SessionManager;
use postgres_sql_lsp_lsp::validation::validate_document;
use postgres_sql_lsp_test_utils::{MockSession, MockSessionFactory};

fn document(sql: &str) -> Document {
    let uri = Url::parse("file:///test.sql").unwrap();
    Document::new(uri, sql.to_string(), 1, "postgres-sql".to_string())
}

fn descriptor() -> ConnectionDescriptor {
    ConnectionDescriptor {
        label: None,
        host: "localhost".to_string(),
        port: 5432,
        user: "postgres".to_string(),
        password: String::new(),
        database: Some("app".to_string()),
        schema: None,
        cert_path: None,
    }
}

async fn connected_manager(template: MockSession) -> (SessionManager, MockSession) {
    let manager = SessionManager::new(Arc::new(MockSessionFactory::new(template.clone())));
    manager.set_connection(descriptor()).await.unwrap();
    (manager, template)
}

#[tokio::test]
async fn test_no_session_produces_no_diagnostics() {
    let manager = SessionManager::new(Arc::new(MockSessionFactory::new(MockSession::new(150_000))));
    let result = validate_document(&manager, &document("SELECT 1;")).await;
    assert!(result.is_none());
}

#[tokio::test]
async fn test_valid_statements_clear_diagnostics() {
    let (manager, _) = connected_manager(MockSession::new(150_000)).await;
    let diagnostics = validate_document(&manager, &document("SELECT 1;\nSELECT 2;"))
        .await
        .expect("session active");
    assert!(diagnostics.is_empty());
}

#[tokio::test]
async fn test_each_statement_is_explained() {
    let (manager, template) = connected_manager(MockSession::new(150_000)).await;
    validate_document(&manager, &document("SELECT 1;\nSELECT 2;"))
        .await
        .unwrap();

    let explains: Vec<_> = template
        .executed_queries()
        .into_iter()
        .filter(|q| q.starts_with("EXPLAIN "))
        .collect();
    assert_eq!(explains, vec!["EXPLAIN SELECT 1;", "EXPLAIN SELECT 2;"]);
}

#[tokio::test]
async fn test_error_position_maps_to_token_range() {
    let session = MockSession::new(150_000).with_error(
        "nosuchtable",
        CatalogError::QueryFailed {
            message: "relation \"nosuchtable\" does not exist".to_string(),
            // 1-based position of the table name inside
            // `EXPLAIN SELECT * FROM nosuchtable;`
            position: Some(23),
            code: Some("42P01".to_string()),
        },
    );
    let (manager, _) = connected_manager(session).await;

    let diagnostics = validate_document(&manager, &document("SELECT * FROM nosuchtable;"))
        .await
        .unwrap();

    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert!(diagnostic.message.contains("nosuchtable"));
    assert_eq!(diagnostic.range.start.line, 0);
    assert_eq!(diagnostic.range.start.character, 14);
    assert!(diagnostic.range.end.character >= 25);
}

#[tokio::test]
async fn test_error_without_position_spans_statement() {
    let session = MockSession::new(150_000)
        .with_error("EXPLAIN", CatalogError::query("something went wrong"));
    let (manager, _) = connected_manager(session).await;

    let diagnostics = validate_document(&manager, &document("SELECT broken;"))
        .await
        .unwrap();

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].range.start.character, 0);
    assert_eq!(diagnostics[0].range.end.character, 14);
}

#[tokio::test]
async fn test_failing_statement_does_not_stop_later_statements() {
    let session = MockSession::new(150_000).with_error(
        "nosuchtable",
        CatalogError::QueryFailed {
            message: "relation does not exist".to_string(),
            position: Some(23),
            code: None,
        },
    );
    let (manager, template) = connected_manager(session).await;

    let diagnostics = validate_document(
        &manager,
        &document("SELECT * FROM nosuchtable;\nSELECT 1;"),
    )
    .await
    .unwrap();

    assert_eq!(diagnostics.len(), 1);
    let explains = template
        .executed_queries()
        .into_iter()
        .filter(|q| q.starts_with("EXPLAIN "))
        .count();
    assert_eq!(explains, 2);
}

#[tokio::test]
async fn test_comment_only_document_yields_no_queries() {
    let (manager, template) = connected_manager(MockSession::new(150_000)).await;
    let diagnostics = validate_document(&manager, &document("-- nothing here\n"))
        .await
        .unwrap();

    assert!(diagnostics.is_empty());
    assert!(!template
        .executed_queries()
        .iter()
        .any(|q| q.starts_with("EXPLAIN ")));
}

#[tokio::test]
async fn test_unterminated_literal_is_reported_not_explained() {
    let (manager, template) = connected_manager(MockSession::new(150_000)).await;
    let diagnostics = validate_document(&manager, &document("SELECT 'oops"))
        .await
        .unwrap();

    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("Unterminated"));
    assert!(!template
        .executed_queries()
        .iter()
        .any(|q| q.starts_with("EXPLAIN ")));
}

#[tokio::test]
async fn test_diagnostics_carry_the_server_source() {
    let session = MockSession::new(150_000)
        .with_error("EXPLAIN", CatalogError::query("bad"));
    let (manager, _) = connected_manager(session).await;

    let diagnostics = validate_document(&manager, &document("SELECT broken;"))
        .await
        .unwrap();
    assert_eq!(diagnostics[0].source.as_deref(), Some("postgres-sql-lsp"));
}
