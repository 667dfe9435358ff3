// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Cache rebuild tests against a scripted session.

use postgres_sql_lsp_catalog::{CacheBuilder, CatalogError, QueryResult};
use postgres_sql_lsp_test_utils::MockSession;

fn tables_result() -> QueryResult {
    QueryResult {
        rows: vec![
            vec![
                Some("public".to_string()),
                Some("users".to_string()),
                Some("true".to_string()),
                Some(
                    r#"[{"name":"id","data_type":"integer"},{"name":"name","data_type":"text"}]"#
                        .to_string(),
                ),
            ],
            vec![
                Some("public".to_string()),
                Some("active_users".to_string()),
                Some("false".to_string()),
                Some(r#"[{"name":"id","data_type":"integer"}]"#.to_string()),
            ],
        ],
        fields: vec![],
    }
}

fn functions_result() -> QueryResult {
    let row = |args: &str| {
        vec![
            Some("public".to_string()),
            Some("add_user".to_string()),
            Some("insert a user".to_string()),
            Some("integer".to_string()),
            Some(args.to_string()),
            Some("normal".to_string()),
        ]
    };
    QueryResult {
        rows: vec![row("name text"), row("name text, active boolean")],
        fields: vec![],
    }
}

fn scripted_session(version: u32) -> MockSession {
    // `pg_namespace` is registered last: the tables and functions queries
    // JOIN pg_namespace, so the broad needle would otherwise shadow the
    // specific `pg_tables`/`pg_proc` responses (earlier entries win).
    MockSession::new(version)
        .with_response("pg_tables", Ok(tables_result()))
        .with_response("pg_proc", Ok(functions_result()))
        .with_names("pg_get_keywords", &["select", "from"])
        .with_names("pg_database", &["app", "postgres"])
        .with_names("pg_namespace", &["public", "other"])
}

#[tokio::test]
async fn test_build_populates_all_collections() {
    let mut session = scripted_session(150_000);
    let cache = CacheBuilder::build(&mut session).await;

    assert_eq!(cache.schemas, vec!["public", "other"]);
    assert_eq!(cache.tables.len(), 2);
    assert!(cache.tables[0].is_table);
    assert!(!cache.tables[1].is_table);
    assert_eq!(cache.tables[0].columns.len(), 2);
    assert_eq!(cache.functions.len(), 1);
    assert_eq!(cache.functions[0].overloads.len(), 2);
    assert_eq!(cache.keywords, vec!["select", "from"]);
    assert_eq!(cache.databases, vec!["app", "postgres"]);
}

#[tokio::test]
async fn test_one_failing_query_degrades_only_its_collection() {
    // `pg_namespace` registered last; see `scripted_session` for why.
    let mut session = MockSession::new(150_000)
        .with_response("pg_tables", Ok(tables_result()))
        .with_error("pg_proc", CatalogError::query("permission denied for pg_proc"))
        .with_names("pg_get_keywords", &["select", "from"])
        .with_names("pg_database", &["app", "postgres"])
        .with_names("pg_namespace", &["public", "other"]);

    let cache = CacheBuilder::build(&mut session).await;

    assert!(cache.functions.is_empty());
    assert_eq!(cache.schemas.len(), 2);
    assert_eq!(cache.tables.len(), 2);
    assert_eq!(cache.keywords.len(), 2);
    assert_eq!(cache.databases.len(), 2);
}

#[tokio::test]
async fn test_all_queries_failing_yields_empty_cache() {
    let mut session = MockSession::new(150_000)
        .with_error("pg_namespace", CatalogError::query("nope"))
        .with_error("pg_tables", CatalogError::query("nope"))
        .with_error("pg_proc", CatalogError::query("nope"))
        .with_error("pg_get_keywords", CatalogError::query("nope"))
        .with_error("pg_database", CatalogError::query("nope"));

    let cache = CacheBuilder::build(&mut session).await;

    assert!(cache.schemas.is_empty());
    assert!(cache.tables.is_empty());
    assert!(cache.functions.is_empty());
    assert!(cache.keywords.is_empty());
    assert!(cache.databases.is_empty());
}

#[tokio::test]
async fn test_function_query_dispatches_on_server_version() {
    let mut session = scripted_session(110_000);
    let _ = CacheBuilder::build(&mut session).await;
    let executed = session.executed_queries().join("\n");
    assert!(executed.contains("prokind"));
    assert!(!executed.contains("proisagg"));

    let mut session = scripted_session(100_000);
    let _ = CacheBuilder::build(&mut session).await;
    let executed = session.executed_queries().join("\n");
    assert!(executed.contains("proisagg"));
    assert!(!executed.contains("prokind"));
}

#[tokio::test]
async fn test_build_issues_five_queries() {
    let mut session = scripted_session(150_000);
    let _ = CacheBuilder::build(&mut session).await;
    assert_eq!(session.executed_queries().len(), 5);
}
