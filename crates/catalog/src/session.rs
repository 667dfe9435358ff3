// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Database session abstraction
//!
//! The rest of the system talks to the database through the narrow
//! [`SqlSession`] trait: run a query, read the server version, close.
//! [`PgSession`] is the live implementation over a single sqlx
//! `PgConnection` — one connection, no pool, so every query on a session
//! is naturally serialized. Tests substitute a scripted mock.
//!
//! Result values cross the trait boundary as text (every catalog query
//! casts its projection to `text`), which keeps the interface mockable
//! and the cache builder driver-independent.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgDatabaseError, PgErrorPosition, PgSslMode};
use sqlx::{Column, Connection, Row, TypeInfo};
use tracing::warn;

use crate::descriptor::ConnectionDescriptor;
use crate::error::{CatalogError, CatalogResult};

/// One result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub type_name: String,
}

/// Rows and fields from one query. Values are text-rendered; `None`
/// marks SQL NULL or a value that has no text form.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub rows: Vec<Vec<Option<String>>>,
    pub fields: Vec<FieldInfo>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A live database session.
///
/// Exactly one exists per process at a time; it is owned by the session
/// manager and replaced wholesale on connection switches.
#[async_trait]
pub trait SqlSession: Send {
    /// Run a query and collect all rows.
    async fn query(&mut self, sql: &str) -> CatalogResult<QueryResult>;

    /// The server's `server_version_num`, captured at open time.
    fn server_version_num(&self) -> u32;

    /// Close the session, consuming it.
    async fn close(self: Box<Self>);
}

/// Opens sessions from connection descriptors.
///
/// The live factory produces [`PgSession`]s; tests inject a counting
/// factory to observe open/teardown behavior.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, descriptor: &ConnectionDescriptor) -> CatalogResult<Box<dyn SqlSession>>;
}

/// Live session over a single PostgreSQL connection.
pub struct PgSession {
    conn: PgConnection,
    version_num: u32,
}

impl PgSession {
    /// Open a connection for a descriptor and capture the server version.
    pub async fn open(descriptor: &ConnectionDescriptor) -> CatalogResult<PgSession> {
        let mut options = PgConnectOptions::new()
            .host(&descriptor.host)
            .port(descriptor.port)
            .username(&descriptor.user)
            .password(&descriptor.password)
            .application_name("postgres-sql-lsp");
        if let Some(database) = &descriptor.database {
            options = options.database(database);
        }
        if let Some(cert_path) = &descriptor.cert_path {
            options = options
                .ssl_mode(PgSslMode::VerifyCa)
                .ssl_root_cert(cert_path);
        }

        let mut conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| CatalogError::ConnectionFailed(e.to_string()))?;

        let version_num = match sqlx::query("SELECT current_setting('server_version_num')")
            .fetch_one(&mut conn)
            .await
            .map_err(map_query_error)
            .and_then(|row| {
                row.try_get::<String, _>(0)
                    .map_err(|e| CatalogError::query(e.to_string()))
            }) {
            Ok(raw) => raw.parse::<u32>().unwrap_or_default(),
            Err(e) => {
                warn!("could not determine server version: {e}");
                0
            }
        };

        Ok(PgSession { conn, version_num })
    }
}

#[async_trait]
impl SqlSession for PgSession {
    async fn query(&mut self, sql: &str) -> CatalogResult<QueryResult> {
        let rows = sqlx::query(sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(map_query_error)?;

        let fields = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|column| FieldInfo {
                        name: column.name().to_string(),
                        type_name: column.type_info().name().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let rows = rows
            .iter()
            .map(|row| {
                (0..row.columns().len())
                    .map(|i| row.try_get::<Option<String>, _>(i).ok().flatten())
                    .collect()
            })
            .collect();

        Ok(QueryResult { rows, fields })
    }

    fn server_version_num(&self) -> u32 {
        self.version_num
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.conn.close().await {
            warn!("error closing session: {e}");
        }
    }
}

/// Live factory producing [`PgSession`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgSessionFactory;

#[async_trait]
impl SessionFactory for PgSessionFactory {
    async fn open(&self, descriptor: &ConnectionDescriptor) -> CatalogResult<Box<dyn SqlSession>> {
        let session = PgSession::open(descriptor).await?;
        Ok(Box::new(session))
    }
}

/// Translate a driver error, preserving the server-reported error
/// position when one exists.
fn map_query_error(err: sqlx::Error) -> CatalogError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(pg) = db_err.try_downcast_ref::<PgDatabaseError>() {
                let position = match pg.position() {
                    Some(PgErrorPosition::Original(p)) => Some(p),
                    _ => None,
                };
                return CatalogError::QueryFailed {
                    message: pg.message().to_string(),
                    position,
                    code: Some(pg.code().to_string()),
                };
            }
            CatalogError::query(db_err.message().to_string())
        }
        _ => CatalogError::query(err.to_string()),
    }
}
