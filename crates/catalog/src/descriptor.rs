// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Connection descriptor
//!
//! The connection descriptor is owned by the editor-side collaborator and
//! arrives by value with every `set_connection` request. The session
//! manager compares descriptors to decide whether a request is a genuine
//! connection switch or a redundant re-send for the same database.

use serde::{Deserialize, Serialize};

/// Default PostgreSQL port
pub const DEFAULT_PORT: u16 = 5432;

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Parameters describing one database connection.
///
/// `label` is a display name chosen by the user; it plays no part in
/// connection identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDescriptor {
    #[serde(default)]
    pub label: Option<String>,

    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Database to connect to; the server default applies when absent.
    #[serde(default)]
    pub database: Option<String>,

    /// Preferred schema for unqualified lookups.
    #[serde(default)]
    pub schema: Option<String>,

    /// Path to a CA certificate file; enables TLS when present.
    #[serde(default)]
    pub cert_path: Option<String>,
}

impl ConnectionDescriptor {
    /// Whether two descriptors address the same database.
    ///
    /// Identity is host/port/user/database; password, label, schema and
    /// TLS options do not force a reconnect on their own, so repeated
    /// focus events with an unchanged target stay a no-op.
    pub fn same_connection(&self, other: &ConnectionDescriptor) -> bool {
        self.host == other.host
            && self.port == other.port
            && self.user == other.user
            && self.database == other.database
    }

    /// A copy of this descriptor pointed at another database.
    pub fn with_database(&self, dbname: impl Into<String>) -> ConnectionDescriptor {
        ConnectionDescriptor {
            database: Some(dbname.into()),
            ..self.clone()
        }
    }
}

/// Quote an identifier the way the server would.
///
/// Doubles embedded quotes and wraps the name, matching the server's own
/// quoting rules for identifiers that need it.
pub fn quoted_ident(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 2);
    result.push('"');
    for ch in name.chars() {
        if ch == '"' {
            result.push('"');
        }
        result.push(ch);
    }
    result.push('"');
    result
}
