// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Version-dispatched metadata queries
//!
//! The catalog queries issued during a cache rebuild depend on the
//! connected server's version: newer servers replace `proisagg` /
//! `proiswindow` with `prokind`, and future syntax changes slot in the
//! same way. Instead of scattering version conditionals through the cache
//! builder, the query text is selected through a dispatch table: a base
//! set of named query fragments plus an ordered list of
//! `(minimum version, overrides)` entries that are merged cumulatively,
//! in ascending version order, up to and including the connected server's
//! `server_version_num`.
//!
//! The base set targets PostgreSQL 9.4 and newer (it relies on
//! `json_build_object` for column aggregation).

/// The named query fragments one cache rebuild needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlQueries {
    /// Non-system schemas visible to the session user.
    pub schemas: &'static str,

    /// Tables and views with their columns aggregated as JSON.
    pub tables_and_columns: &'static str,

    /// Functions with result type, argument list and description.
    pub functions: &'static str,

    /// Reserved and unreserved keywords.
    pub keywords: &'static str,

    /// Connectable databases.
    pub databases: &'static str,
}

/// Per-version replacements for individual fragments.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOverrides {
    pub schemas: Option<&'static str>,
    pub tables_and_columns: Option<&'static str>,
    pub functions: Option<&'static str>,
    pub keywords: Option<&'static str>,
    pub databases: Option<&'static str>,
}

const SCHEMAS: &str = r#"
SELECT nspname::text AS name
FROM pg_catalog.pg_namespace
WHERE nspname NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
  AND nspname NOT LIKE 'pg_temp_%'
  AND nspname NOT LIKE 'pg_toast_temp_%'
  AND has_schema_privilege(oid, 'CREATE, USAGE')
ORDER BY nspname;
"#;

const TABLES_AND_COLUMNS: &str = r#"
SELECT
  tbl.schemaname::text AS schema,
  tbl.tablename::text AS name,
  tbl.is_table::text AS is_table,
  json_agg(json_build_object(
    'name', a.attname,
    'data_type', format_type(a.atttypid, a.atttypmod)
  ) ORDER BY a.attnum)::text AS columns
FROM (
  SELECT schemaname, tablename, true AS is_table
  FROM pg_catalog.pg_tables
  WHERE schemaname NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
  UNION ALL
  SELECT schemaname, viewname AS tablename, false AS is_table
  FROM pg_catalog.pg_views
  WHERE schemaname NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
) tbl
JOIN pg_catalog.pg_namespace n ON n.nspname = tbl.schemaname
JOIN pg_catalog.pg_class c ON c.relname = tbl.tablename AND c.relnamespace = n.oid
JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid
WHERE a.attnum > 0
  AND NOT a.attisdropped
  AND has_column_privilege(c.oid, a.attnum, 'SELECT, INSERT, UPDATE, REFERENCES')
GROUP BY tbl.schemaname, tbl.tablename, tbl.is_table
ORDER BY tbl.schemaname, tbl.tablename;
"#;

const FUNCTIONS: &str = r#"
SELECT
  n.nspname::text AS schema,
  p.proname::text AS name,
  d.description::text,
  pg_catalog.pg_get_function_result(p.oid)::text AS result_type,
  pg_catalog.pg_get_function_arguments(p.oid)::text AS argument_types,
  CASE
    WHEN p.proisagg THEN 'agg'
    WHEN p.proiswindow THEN 'window'
    ELSE 'normal'
  END::text AS "type"
FROM pg_catalog.pg_proc p
  LEFT JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
  LEFT JOIN pg_catalog.pg_description d ON p.oid = d.objoid
WHERE n.nspname <> 'information_schema'
  AND pg_catalog.pg_function_is_visible(p.oid)
  AND p.prorettype <> 'pg_catalog.trigger'::pg_catalog.regtype
  AND has_schema_privilege(quote_ident(n.nspname), 'USAGE') = true
  AND has_function_privilege(p.oid, 'execute') = true
ORDER BY 1, 2, 4;
"#;

/// PostgreSQL 11 removed `proisagg`/`proiswindow` in favor of `prokind`.
const FUNCTIONS_PROKIND: &str = r#"
SELECT
  n.nspname::text AS schema,
  p.proname::text AS name,
  d.description::text,
  pg_catalog.pg_get_function_result(p.oid)::text AS result_type,
  pg_catalog.pg_get_function_arguments(p.oid)::text AS argument_types,
  CASE
    WHEN p.prokind = 'a' THEN 'agg'
    WHEN p.prokind = 'w' THEN 'window'
    ELSE 'normal'
  END::text AS "type"
FROM pg_catalog.pg_proc p
  LEFT JOIN pg_catalog.pg_namespace n ON n.oid = p.pronamespace
  LEFT JOIN pg_catalog.pg_description d ON p.oid = d.objoid
WHERE n.nspname <> 'information_schema'
  AND pg_catalog.pg_function_is_visible(p.oid)
  AND p.prorettype <> 'pg_catalog.trigger'::pg_catalog.regtype
  AND has_schema_privilege(quote_ident(n.nspname), 'USAGE') = true
  AND has_function_privilege(p.oid, 'execute') = true
ORDER BY 1, 2, 4;
"#;

const KEYWORDS: &str = r#"
SELECT word::text FROM pg_catalog.pg_get_keywords() ORDER BY word;
"#;

const DATABASES: &str = r#"
SELECT datname::text
FROM pg_catalog.pg_database
WHERE datistemplate = false
  AND has_database_privilege(quote_ident(datname), 'TEMP, CONNECT')
ORDER BY datname;
"#;

const BASE: SqlQueries = SqlQueries {
    schemas: SCHEMAS,
    tables_and_columns: TABLES_AND_COLUMNS,
    functions: FUNCTIONS,
    keywords: KEYWORDS,
    databases: DATABASES,
};

/// Fragment overrides, ascending by minimum server version.
const VERSION_OVERRIDES: &[(u32, QueryOverrides)] = &[(
    110_000,
    QueryOverrides {
        schemas: None,
        tables_and_columns: None,
        functions: Some(FUNCTIONS_PROKIND),
        keywords: None,
        databases: None,
    },
)];

impl SqlQueries {
    /// Select the query set for a server version (`server_version_num`
    /// format, e.g. `150002` for 15.2).
    pub fn for_version(version_num: u32) -> SqlQueries {
        Self::merged(version_num, VERSION_OVERRIDES)
    }

    /// Fold an ordered override list onto the base set.
    fn merged(version_num: u32, overrides: &[(u32, QueryOverrides)]) -> SqlQueries {
        let mut queries = BASE;
        for (min_version, entry) in overrides {
            if *min_version > version_num {
                continue;
            }
            queries.apply(entry);
        }
        queries
    }

    fn apply(&mut self, entry: &QueryOverrides) {
        if let Some(sql) = entry.schemas {
            self.schemas = sql;
        }
        if let Some(sql) = entry.tables_and_columns {
            self.tables_and_columns = sql;
        }
        if let Some(sql) = entry.functions {
            self.functions = sql;
        }
        if let Some(sql) = entry.keywords {
            self.keywords = sql;
        }
        if let Some(sql) = entry.databases {
            self.databases = sql;
        }
    }
}
