// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Scripted [`SqlSession`] implementation for tests.
//!
//! Responses are matched by substring against the query text, so a test
//! can script "any query mentioning pg_get_keywords fails" without
//! repeating whole catalog queries. Unmatched queries succeed with an
//! empty result. Open and query counts are shared through `Arc` counters
//! so tests can assert on session lifecycle behavior (e.g. that an
//! identical descriptor does not reopen a session).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use postgres_sql_lsp_catalog::{
    CatalogError, CatalogResult, ConnectionDescriptor, QueryResult, SessionFactory, SqlSession,
};

type ScriptedResponse = (String, CatalogResult<QueryResult>);

/// A scripted database session.
#[derive(Clone, Default)]
pub struct MockSession {
    version_num: u32,
    responses: Arc<Vec<ScriptedResponse>>,
    queries: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

impl MockSession {
    pub fn new(version_num: u32) -> Self {
        Self {
            version_num,
            ..Default::default()
        }
    }

    /// Script a response for queries containing `needle`. Earlier entries
    /// win when several match.
    pub fn with_response(
        mut self,
        needle: impl Into<String>,
        response: CatalogResult<QueryResult>,
    ) -> Self {
        let responses = Arc::make_mut(&mut self.responses);
        responses.push((needle.into(), response));
        self
    }

    /// Script a successful single-column result.
    pub fn with_names(self, needle: impl Into<String>, names: &[&str]) -> Self {
        let rows = names.iter().map(|n| vec![Some(n.to_string())]).collect();
        self.with_response(
            needle,
            Ok(QueryResult {
                rows,
                fields: vec![],
            }),
        )
    }

    /// Script a failure.
    pub fn with_error(self, needle: impl Into<String>, error: CatalogError) -> Self {
        self.with_response(needle, Err(error))
    }

    /// Every query text this session has executed, in order.
    pub fn executed_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    /// Handle to the close counter, usable after the session is consumed.
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        self.closes.clone()
    }
}

#[async_trait]
impl SqlSession for MockSession {
    async fn query(&mut self, sql: &str) -> CatalogResult<QueryResult> {
        self.queries.lock().unwrap().push(sql.to_string());
        for (needle, response) in self.responses.iter() {
            if sql.contains(needle.as_str()) {
                return response.clone();
            }
        }
        Ok(QueryResult::default())
    }

    fn server_version_num(&self) -> u32 {
        self.version_num
    }

    async fn close(self: Box<Self>) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Session factory handing out clones of a template [`MockSession`],
/// counting opens and optionally failing them.
#[derive(Clone, Default)]
pub struct MockSessionFactory {
    template: MockSession,
    opens: Arc<AtomicUsize>,
    fail_with: Option<String>,
}

impl MockSessionFactory {
    pub fn new(template: MockSession) -> Self {
        Self {
            template,
            ..Default::default()
        }
    }

    /// Make every open fail with a connection error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    async fn open(&self, _descriptor: &ConnectionDescriptor) -> CatalogResult<Box<dyn SqlSession>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(message) => Err(CatalogError::ConnectionFailed(message.clone())),
            None => Ok(Box::new(self.template.clone())),
        }
    }
}
