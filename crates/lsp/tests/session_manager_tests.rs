// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Session manager lifecycle tests

use std::sync::atomic::Ordering;
use std::sync::Arc;

use postgres_sql_lsp_catalog::{CatalogError, ConnectionDescriptor};
use postgres_sql_lsp_lsp::session_manager::{SessionManager, SwitchOutcome};
use postgres_sql_lsp_test_utils::{MockSession, MockSessionFactory};

fn descriptor(host: &str, database: &str) -> ConnectionDescriptor {
    ConnectionDescriptor {
        label: None,
        host: host.to_string(),
        port: 5432,
        user: "postgres".to_string(),
        password: "secret".to_string(),
        database: Some(database.to_string()),
        schema: None,
        cert_path: None,
    }
}

fn scripted_factory() -> MockSessionFactory {
    let session = MockSession::new(150_000)
        .with_names("pg_namespace", &["public"])
        .with_names("pg_get_keywords", &["select"]);
    MockSessionFactory::new(session)
}

#[tokio::test]
async fn test_set_connection_opens_session_and_builds_cache() {
    let factory = scripted_factory();
    let manager = SessionManager::new(Arc::new(factory.clone()));

    let outcome = manager
        .set_connection(descriptor("localhost", "app"))
        .await
        .unwrap();

    assert_eq!(outcome, SwitchOutcome::Connected);
    assert!(manager.has_session().await);
    assert_eq!(factory.open_count(), 1);
    assert_eq!(manager.cache().await.schemas, vec!["public"]);
}

#[tokio::test]
async fn test_identical_descriptor_is_a_no_op() {
    let factory = scripted_factory();
    let manager = SessionManager::new(Arc::new(factory.clone()));

    let first = manager
        .set_connection(descriptor("localhost", "app"))
        .await
        .unwrap();
    let second = manager
        .set_connection(descriptor("localhost", "app"))
        .await
        .unwrap();

    assert_eq!(first, SwitchOutcome::Connected);
    assert_eq!(second, SwitchOutcome::Unchanged);
    // exactly one open and one cache rebuild for the pair of requests
    assert_eq!(factory.open_count(), 1);
}

#[tokio::test]
async fn test_changed_password_alone_does_not_reconnect() {
    let factory = scripted_factory();
    let manager = SessionManager::new(Arc::new(factory.clone()));

    manager
        .set_connection(descriptor("localhost", "app"))
        .await
        .unwrap();
    let mut rotated = descriptor("localhost", "app");
    rotated.password = "rotated".to_string();
    let outcome = manager.set_connection(rotated).await.unwrap();

    assert_eq!(outcome, SwitchOutcome::Unchanged);
    assert_eq!(factory.open_count(), 1);
}

#[tokio::test]
async fn test_switching_databases_closes_previous_session() {
    let template = MockSession::new(150_000);
    let closes = template.close_counter();
    let factory = MockSessionFactory::new(template);
    let manager = SessionManager::new(Arc::new(factory.clone()));

    manager
        .set_connection(descriptor("localhost", "app"))
        .await
        .unwrap();
    manager
        .set_connection(descriptor("localhost", "reporting"))
        .await
        .unwrap();

    assert_eq!(factory.open_count(), 2);
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    manager.shutdown().await;
    assert_eq!(closes.load(Ordering::SeqCst), 2);
    assert!(!manager.has_session().await);
}

#[tokio::test]
async fn test_failed_connection_empties_cache_and_session() {
    // connect successfully first, so there is a cache to lose
    let factory = scripted_factory();
    let manager = SessionManager::new(Arc::new(factory));
    manager
        .set_connection(descriptor("localhost", "app"))
        .await
        .unwrap();
    assert!(!manager.cache().await.schemas.is_empty());

    // the manager's factory cannot be swapped, so model the failure with
    // a second manager sharing nothing but the descriptor
    let failing = SessionManager::new(Arc::new(MockSessionFactory::failing("auth failed")));
    let err = failing
        .set_connection(descriptor("localhost", "app"))
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::ConnectionFailed(_)));
    assert!(!failing.has_session().await);
    assert!(failing.cache().await.schemas.is_empty());

    // a retry with the same descriptor is not treated as a no-op, since
    // the failed attempt left no active connection
    let err = failing
        .set_connection(descriptor("localhost", "app"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::ConnectionFailed(_)));
}

#[tokio::test]
async fn test_run_query_without_session_is_none() {
    let manager = SessionManager::new(Arc::new(scripted_factory()));
    assert!(manager.run_query("SELECT 1").await.is_none());
}

#[tokio::test]
async fn test_run_query_reaches_the_session() {
    let template = MockSession::new(150_000);
    let factory = MockSessionFactory::new(template.clone());
    let manager = SessionManager::new(Arc::new(factory));
    manager
        .set_connection(descriptor("localhost", "app"))
        .await
        .unwrap();

    let result = manager.run_query("EXPLAIN SELECT 1").await;
    assert!(matches!(result, Some(Ok(_))));
    // the template shares its query log with the sessions cloned from it
    assert!(template
        .executed_queries()
        .contains(&"EXPLAIN SELECT 1".to_string()));
}
