// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Session manager
//!
//! Owns the single live database session and the schema cache built from
//! it. A `set_connection` request either is a no-op (same host, port,
//! user and database as the active session) or performs a full switch:
//! the old session is closed — and that teardown is awaited — before the
//! replacement is opened, so two live sessions never coexist. Each
//! successful switch rebuilds the cache wholesale and swaps it in as one
//! `Arc`, so readers never observe a half-built snapshot.
//!
//! All queries go through [`SessionManager::run_query`], which holds the
//! session lock for the duration of the query. One in-flight query at a
//! time is not an implementation accident — the underlying session is a
//! single connection.

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use postgres_sql_lsp_catalog::{
    CacheBuilder, CatalogResult, ConnectionDescriptor, PgSessionFactory, QueryResult, SchemaCache,
    SessionFactory, SqlSession,
};

/// What a `set_connection` request actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Descriptor addressed the already-active database; nothing changed.
    Unchanged,
    /// A new session was opened and the cache rebuilt.
    Connected,
}

struct ActiveConnection {
    descriptor: ConnectionDescriptor,
    session: Box<dyn SqlSession>,
}

/// Owner of the active session and the schema cache.
pub struct SessionManager {
    factory: Arc<dyn SessionFactory>,
    active: Mutex<Option<ActiveConnection>>,
    cache: RwLock<Arc<SchemaCache>>,
}

impl SessionManager {
    /// Create a manager with a custom session factory (tests).
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            active: Mutex::new(None),
            cache: RwLock::new(Arc::new(SchemaCache::default())),
        }
    }

    /// Create a manager backed by live PostgreSQL connections.
    pub fn with_live_factory() -> Self {
        Self::new(Arc::new(PgSessionFactory))
    }

    /// Switch the active connection.
    ///
    /// Identical descriptors (host/port/user/database) are a no-op, so
    /// repeated editor focus events do not reconnect or rebuild. On a
    /// real switch the previous session is torn down first, then the new
    /// session is opened and the cache rebuilt. A failed open empties
    /// the cache and leaves no active session, so the next request is a
    /// fresh connection attempt.
    pub async fn set_connection(
        &self,
        descriptor: ConnectionDescriptor,
    ) -> CatalogResult<SwitchOutcome> {
        let mut active = self.active.lock().await;

        if let Some(current) = active.as_ref() {
            if current.descriptor.same_connection(&descriptor) {
                debug!(
                    host = %descriptor.host,
                    "connection unchanged, skipping reconnect"
                );
                return Ok(SwitchOutcome::Unchanged);
            }
        }

        if let Some(previous) = active.take() {
            info!(host = %previous.descriptor.host, "closing previous session");
            previous.session.close().await;
        }

        match self.factory.open(&descriptor).await {
            Ok(mut session) => {
                let cache = CacheBuilder::build(session.as_mut()).await;
                info!(
                    host = %descriptor.host,
                    tables = cache.tables.len(),
                    "connected, schema cache rebuilt"
                );
                *self.cache.write().await = Arc::new(cache);
                *active = Some(ActiveConnection {
                    descriptor,
                    session,
                });
                Ok(SwitchOutcome::Connected)
            }
            Err(e) => {
                *self.cache.write().await = Arc::new(SchemaCache::default());
                Err(e)
            }
        }
    }

    /// Whether a session is currently active.
    pub async fn has_session(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// The current cache snapshot.
    pub async fn cache(&self) -> Arc<SchemaCache> {
        self.cache.read().await.clone()
    }

    /// Run one query on the active session.
    ///
    /// Returns `None` when no session is active. The session lock is held
    /// for the duration, serializing callers.
    pub async fn run_query(&self, sql: &str) -> Option<CatalogResult<QueryResult>> {
        let mut active = self.active.lock().await;
        let current = active.as_mut()?;
        Some(current.session.query(sql).await)
    }

    /// Close the active session, if any.
    pub async fn shutdown(&self) {
        if let Some(previous) = self.active.lock().await.take() {
            previous.session.close().await;
        }
    }
}
