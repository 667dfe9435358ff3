// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Schema metadata cache
//!
//! The cache holds everything the completion and signature engines read:
//! schema names, tables and views with their columns, functions with
//! their overloads, keywords, and database names. It is rebuilt wholesale
//! on every connection switch and swapped in atomically — readers only
//! ever observe a complete snapshot.
//!
//! The builder issues a fixed battery of independent metadata queries.
//! Each one is individually guarded: a failing query (reduced privileges
//! on a catalog, a version-gated function that does not exist) logs a
//! warning and leaves that one collection empty, without aborting the
//! sibling queries. Users with partial catalog access still get partial
//! intelligence.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::queries::SqlQueries;
use crate::session::{QueryResult, SqlSession};

/// One column of a table or view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

/// One table or view with its columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    /// True for tables, false for views.
    pub is_table: bool,
    pub columns: Vec<ColumnInfo>,
}

/// One argument-list variant of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionOverload {
    pub args: Vec<String>,
    pub description: Option<String>,
}

/// A function name with all overloads sharing its result type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub schema: String,
    pub name: String,
    pub result_type: String,
    /// `normal`, `agg` or `window`.
    pub kind: String,
    pub overloads: Vec<FunctionOverload>,
}

/// Read-only snapshot of one database's schema metadata.
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    pub schemas: Vec<String>,
    pub tables: Vec<TableInfo>,
    pub functions: Vec<FunctionInfo>,
    pub keywords: Vec<String>,
    pub databases: Vec<String>,
}

impl SchemaCache {
    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.iter().any(|s| s == name)
    }

    /// Look up a table or view by schema and name.
    pub fn find_table(&self, schema: &str, name: &str) -> Option<&TableInfo> {
        self.tables
            .iter()
            .find(|t| t.schema == schema && t.name == name)
    }

    /// Look up a table or view by exact name in any schema.
    pub fn find_table_any_schema(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn tables_in_schema<'a>(&'a self, schema: &'a str) -> impl Iterator<Item = &'a TableInfo> {
        self.tables.iter().filter(move |t| t.schema == schema)
    }

    pub fn functions_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FunctionInfo> {
        self.functions.iter().filter(move |f| f.name == name)
    }
}

#[derive(Debug, Deserialize)]
struct ColumnRow {
    name: String,
    data_type: String,
}

/// Builds a [`SchemaCache`] from an open session.
pub struct CacheBuilder;

impl CacheBuilder {
    /// Run the metadata query battery and collect whatever succeeds.
    ///
    /// Never fails as a whole: each collection degrades independently.
    pub async fn build(session: &mut dyn SqlSession) -> SchemaCache {
        let queries = SqlQueries::for_version(session.server_version_num());
        let mut cache = SchemaCache::default();

        match session.query(queries.schemas).await {
            Ok(result) => cache.schemas = Self::parse_names(&result),
            Err(e) => warn!("schema listing unavailable: {e}"),
        }

        match session.query(queries.tables_and_columns).await {
            Ok(result) => cache.tables = Self::parse_tables(&result),
            Err(e) => warn!("table listing unavailable: {e}"),
        }

        match session.query(queries.functions).await {
            Ok(result) => cache.functions = Self::parse_functions(&result),
            Err(e) => warn!("function listing unavailable: {e}"),
        }

        match session.query(queries.keywords).await {
            Ok(result) => cache.keywords = Self::parse_names(&result),
            Err(e) => warn!("keyword listing unavailable: {e}"),
        }

        match session.query(queries.databases).await {
            Ok(result) => cache.databases = Self::parse_names(&result),
            Err(e) => warn!("database listing unavailable: {e}"),
        }

        debug!(
            schemas = cache.schemas.len(),
            tables = cache.tables.len(),
            functions = cache.functions.len(),
            keywords = cache.keywords.len(),
            databases = cache.databases.len(),
            "schema cache rebuilt"
        );
        cache
    }

    /// Single-column name lists (schemas, keywords, databases).
    fn parse_names(result: &QueryResult) -> Vec<String> {
        result
            .rows
            .iter()
            .filter_map(|row| row.first().cloned().flatten())
            .collect()
    }

    /// Rows of (schema, name, is_table, columns-as-json).
    fn parse_tables(result: &QueryResult) -> Vec<TableInfo> {
        result
            .rows
            .iter()
            .filter_map(|row| {
                let schema = row.first().cloned().flatten()?;
                let name = row.get(1).cloned().flatten()?;
                let is_table = matches!(
                    row.get(2).and_then(|v| v.as_deref()),
                    Some("true") | Some("t")
                );
                let columns = match row.get(3).and_then(|v| v.as_deref()) {
                    Some(json) => match serde_json::from_str::<Vec<ColumnRow>>(json) {
                        Ok(rows) => rows
                            .into_iter()
                            .map(|c| ColumnInfo {
                                name: c.name,
                                data_type: c.data_type,
                            })
                            .collect(),
                        Err(e) => {
                            warn!("malformed column list for {schema}.{name}: {e}");
                            Vec::new()
                        }
                    },
                    None => Vec::new(),
                };
                Some(TableInfo {
                    schema,
                    name,
                    is_table,
                    columns,
                })
            })
            .collect()
    }

    /// Rows of (schema, name, description, result_type, argument_types,
    /// type), one per overload; grouped by (schema, name, result_type).
    fn parse_functions(result: &QueryResult) -> Vec<FunctionInfo> {
        let mut functions: Vec<FunctionInfo> = Vec::new();
        for row in &result.rows {
            let Some(schema) = row.first().cloned().flatten() else {
                continue;
            };
            let Some(name) = row.get(1).cloned().flatten() else {
                continue;
            };
            let description = row.get(2).cloned().flatten();
            let result_type = row.get(3).cloned().flatten().unwrap_or_default();
            let argument_types = row.get(4).cloned().flatten().unwrap_or_default();
            let kind = row
                .get(5)
                .cloned()
                .flatten()
                .unwrap_or_else(|| "normal".to_string());

            let overload = FunctionOverload {
                args: split_arguments(&argument_types),
                description,
            };

            match functions.iter_mut().find(|f| {
                f.schema == schema && f.name == name && f.result_type == result_type
            }) {
                Some(existing) => existing.overloads.push(overload),
                None => functions.push(FunctionInfo {
                    schema,
                    name,
                    result_type,
                    kind,
                    overloads: vec![overload],
                }),
            }
        }
        functions
    }
}

/// Split a `pg_get_function_arguments` list into individual arguments.
fn split_arguments(argument_types: &str) -> Vec<String> {
    argument_types
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}
