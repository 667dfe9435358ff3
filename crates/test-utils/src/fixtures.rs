// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Fixture builder for [`SchemaCache`] snapshots.
//!
//! Completion and signature tests construct cache snapshots directly
//! instead of going through a session, keeping them fast and independent
//! of any database.

use postgres_sql_lsp_catalog::{
    ColumnInfo, FunctionInfo, FunctionOverload, SchemaCache, TableInfo,
};

/// Builder producing [`SchemaCache`] fixtures.
#[derive(Debug, Default)]
pub struct SchemaCacheBuilder {
    cache: SchemaCache,
}

impl SchemaCacheBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, name: &str) -> Self {
        self.cache.schemas.push(name.to_string());
        self
    }

    pub fn with_table(self, schema: &str, name: &str, columns: &[(&str, &str)]) -> Self {
        self.with_relation(schema, name, true, columns)
    }

    pub fn with_view(self, schema: &str, name: &str, columns: &[(&str, &str)]) -> Self {
        self.with_relation(schema, name, false, columns)
    }

    fn with_relation(
        mut self,
        schema: &str,
        name: &str,
        is_table: bool,
        columns: &[(&str, &str)],
    ) -> Self {
        if !self.cache.schemas.iter().any(|s| s == schema) {
            self.cache.schemas.push(schema.to_string());
        }
        self.cache.tables.push(TableInfo {
            schema: schema.to_string(),
            name: name.to_string(),
            is_table,
            columns: columns
                .iter()
                .map(|(name, data_type)| ColumnInfo {
                    name: name.to_string(),
                    data_type: data_type.to_string(),
                })
                .collect(),
        });
        self
    }

    /// Add one function overload, grouping it under an existing entry
    /// when name and result type already exist.
    pub fn with_function(
        mut self,
        schema: &str,
        name: &str,
        result_type: &str,
        args: &[&str],
        description: Option<&str>,
    ) -> Self {
        let overload = FunctionOverload {
            args: args.iter().map(|a| a.to_string()).collect(),
            description: description.map(str::to_string),
        };
        match self
            .cache
            .functions
            .iter_mut()
            .find(|f| f.schema == schema && f.name == name && f.result_type == result_type)
        {
            Some(existing) => existing.overloads.push(overload),
            None => self.cache.functions.push(FunctionInfo {
                schema: schema.to_string(),
                name: name.to_string(),
                result_type: result_type.to_string(),
                kind: "normal".to_string(),
                overloads: vec![overload],
            }),
        }
        self
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.cache
            .keywords
            .extend(keywords.iter().map(|k| k.to_string()));
        self
    }

    pub fn with_databases(mut self, databases: &[&str]) -> Self {
        self.cache
            .databases
            .extend(databases.iter().map(|d| d.to_string()));
        self
    }

    /// The fixture most tests use: `public.users(id, name)` and
    /// `other.accounts(id)` plus a couple of functions and keywords.
    pub fn with_standard_schema(self) -> Self {
        self.with_table(
            "public",
            "users",
            &[("id", "integer"), ("name", "character varying(100)")],
        )
        .with_table("other", "accounts", &[("id", "integer")])
        .with_function(
            "pg_catalog",
            "lpad",
            "text",
            &["string text", "length integer"],
            Some("left-pad a string to length"),
        )
        .with_function(
            "pg_catalog",
            "lpad",
            "text",
            &["string text", "length integer", "fill text"],
            Some("left-pad a string to length with fill"),
        )
        .with_function("pg_catalog", "now", "timestamp with time zone", &[], None)
        .with_keywords(&["select", "from", "where"])
        .with_databases(&["app", "postgres"])
    }

    pub fn build(self) -> SchemaCache {
        self.cache
    }
}
