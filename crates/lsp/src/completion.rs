// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Completion engine
//!
//! Resolves a cursor position and trigger character into completion
//! items, reading only the schema cache — never the database. The
//! trigger character selects the resolution strategy:
//!
//! - no trigger (explicit invocation): the full contextual universe —
//!   schemas, tables and views, deduplicated columns, functions,
//!   keywords and databases
//! - `.`: backward dotted-chain resolution (`schema.table.` and friends)
//! - `"`: quoted-identifier resolution, distinguishing an opening quote
//!   from one that just closed
//!
//! Unquoted identifiers fold to lowercase before cache lookups, matching
//! how the server folds them; quoted identifiers match exact-case.

use std::collections::BTreeMap;
use std::sync::Arc;

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, Documentation, Position,
};

use postgres_sql_lsp_catalog::{quoted_ident, SchemaCache, TableInfo};
use postgres_sql_lsp_text::{BackwardIterator, Ident};

use crate::document::Document;

/// Completion engine over one cache snapshot.
pub struct CompletionEngine {
    cache: Arc<SchemaCache>,
    default_schema: String,
}

impl CompletionEngine {
    pub fn new(cache: Arc<SchemaCache>, default_schema: impl Into<String>) -> Self {
        Self {
            cache,
            default_schema: default_schema.into(),
        }
    }

    /// Produce completion items for a cursor position.
    pub fn complete(
        &self,
        document: &Document,
        position: Position,
        trigger_character: Option<&str>,
    ) -> Vec<CompletionItem> {
        let text = document.get_content();
        match trigger_character {
            Some(".") => self.complete_after_period(&text, position),
            Some("\"") => self.complete_after_dquote(&text, position),
            _ => self.complete_universe(),
        }
    }

    /// `.`-triggered completion: resolve the dotted chain before the
    /// cursor against schema and table names.
    fn complete_after_period(&self, text: &str, position: Position) -> Vec<CompletionItem> {
        let mut iter = BackwardIterator::new(text, position.line, position.character);
        if iter.is_next_period() {
            iter.next();
        }
        let idents = iter.read_idents(3);
        if idents.is_empty() {
            return Vec::new();
        }

        // First identifier names a schema when it matches one; otherwise
        // the default schema applies and the identifier is the table.
        let first_key = idents[0].folded();
        let (schema, rest) = if self.cache.has_schema(&first_key) {
            (first_key, &idents[1..])
        } else {
            (self.default_schema.clone(), &idents[..])
        };

        match rest.first() {
            None => self.render_tables_in_schema(&schema),
            Some(table_ident) => {
                let table_name = table_ident.folded();
                match self.cache.find_table(&schema, &table_name) {
                    Some(table) => render_columns(table),
                    None => Vec::new(),
                }
            }
        }
    }

    /// `"`-triggered completion.
    ///
    /// A forward peek distinguishes an opening quote (editors auto-close,
    /// leaving the mate right after the cursor) from a closing one. An
    /// opening quote preceded by `ident.` resolves that identifier as a
    /// table and offers its columns; a closing quote recovers the quoted
    /// identifier and resolves it as an exact-cased table name. Anything
    /// else lists all tables with properly quoted labels.
    fn complete_after_dquote(&self, text: &str, position: Position) -> Vec<CompletionItem> {
        let mut iter = BackwardIterator::new(text, position.line, position.character);

        if iter.is_forward_dquote() {
            // opening quote; step back past it
            iter.next();
            if iter.is_next_period() {
                iter.next();
                let ident = iter.read_ident();
                if ident.is_empty() {
                    return Vec::new();
                }
                return match self.lookup_table(&ident) {
                    Some(table) => render_columns(table),
                    None => Vec::new(),
                };
            }
            return self.render_all_tables_quoted();
        }

        // closing quote: the identifier it closed is an exact-cased name
        let ident = iter.read_ident();
        if ident.quoted && !ident.is_empty() {
            if let Some(table) = self.cache.find_table_any_schema(&ident.text) {
                return render_columns(table);
            }
        }
        self.render_all_tables_quoted()
    }

    /// Explicit invocation: the full contextual universe.
    fn complete_universe(&self) -> Vec<CompletionItem> {
        let mut items = Vec::new();

        for schema in &self.cache.schemas {
            items.push(item(schema.clone(), CompletionItemKind::MODULE, "schema"));
        }

        for table in &self.cache.tables {
            let detail = if table.schema == self.default_schema {
                relation_kind(table).to_string()
            } else {
                format!("{}.{}", table.schema, table.name)
            };
            items.push(CompletionItem {
                label: table.name.clone(),
                kind: Some(table_kind(table)),
                detail: Some(detail),
                ..Default::default()
            });
        }

        // columns deduplicated by name and type, annotated with the
        // tables they belong to
        let mut columns: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
        for table in &self.cache.tables {
            for column in &table.columns {
                columns
                    .entry((column.name.clone(), column.data_type.clone()))
                    .or_default()
                    .push(table.name.clone());
            }
        }
        for ((name, data_type), tables) in columns {
            items.push(CompletionItem {
                label: name,
                kind: Some(CompletionItemKind::FIELD),
                detail: Some(data_type),
                documentation: Some(Documentation::String(format!(
                    "tables: {}",
                    tables.join(", ")
                ))),
                ..Default::default()
            });
        }

        for function in &self.cache.functions {
            let documentation = function
                .overloads
                .iter()
                .find_map(|o| o.description.clone())
                .map(Documentation::String);
            items.push(CompletionItem {
                label: function.name.clone(),
                kind: Some(CompletionItemKind::FUNCTION),
                detail: Some(function.result_type.clone()),
                documentation,
                ..Default::default()
            });
        }

        for keyword in &self.cache.keywords {
            items.push(CompletionItem {
                label: keyword.clone(),
                kind: Some(CompletionItemKind::KEYWORD),
                ..Default::default()
            });
        }

        for database in &self.cache.databases {
            items.push(item(
                database.clone(),
                CompletionItemKind::CONSTANT,
                "database",
            ));
        }

        items
    }

    fn render_tables_in_schema(&self, schema: &str) -> Vec<CompletionItem> {
        self.cache
            .tables_in_schema(schema)
            .map(|table| {
                item(
                    table.name.clone(),
                    table_kind(table),
                    relation_kind(table),
                )
            })
            .collect()
    }

    fn render_all_tables_quoted(&self) -> Vec<CompletionItem> {
        self.cache
            .tables
            .iter()
            .map(|table| {
                item(
                    quoted_ident(&table.name),
                    table_kind(table),
                    relation_kind(table),
                )
            })
            .collect()
    }

    /// Resolve an identifier to a table: default schema first, then any
    /// schema; quoted identifiers are matched exact-case.
    fn lookup_table(&self, ident: &Ident) -> Option<&TableInfo> {
        let name = ident.folded();
        self.cache
            .find_table(&self.default_schema, &name)
            .or_else(|| self.cache.find_table_any_schema(&name))
    }
}

fn render_columns(table: &TableInfo) -> Vec<CompletionItem> {
    table
        .columns
        .iter()
        .map(|column| CompletionItem {
            label: column.name.clone(),
            kind: Some(CompletionItemKind::FIELD),
            detail: Some(column.data_type.clone()),
            ..Default::default()
        })
        .collect()
}

fn table_kind(table: &TableInfo) -> CompletionItemKind {
    if table.is_table {
        CompletionItemKind::CLASS
    } else {
        CompletionItemKind::INTERFACE
    }
}

fn relation_kind(table: &TableInfo) -> &'static str {
    if table.is_table {
        "table"
    } else {
        "view"
    }
}

fn item(label: String, kind: CompletionItemKind, detail: &str) -> CompletionItem {
    CompletionItem {
        label,
        kind: Some(kind),
        detail: Some(detail.to_string()),
        ..Default::default()
    }
}
