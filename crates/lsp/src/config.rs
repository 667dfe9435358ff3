// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Server settings
//!
//! Settings arrive once through the client's `initializationOptions`.
//! Connection parameters are deliberately *not* part of the settings:
//! the active connection only ever changes through the `set_connection`
//! request, so that the editor-side connection switcher remains the
//! single source of truth for which database is live.
//!
//! Expected shape:
//!
//! ```json
//! {
//!   "postgresSqlLsp": {
//!     "defaultSchema": "public",
//!     "validateOnChange": true
//!   }
//! }
//! ```

use serde_json::Value;

use postgres_sql_lsp_catalog::DEFAULT_SCHEMA;

/// Runtime settings for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Schema assumed for unqualified table lookups.
    pub default_schema: String,

    /// Re-validate on every change event (in addition to open events).
    pub validate_on_change: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            default_schema: DEFAULT_SCHEMA.to_string(),
            validate_on_change: true,
        }
    }
}

impl ServerSettings {
    /// Parse settings from the client's initialization options, falling
    /// back to defaults for anything absent or malformed.
    pub fn from_initialization_options(options: Option<&Value>) -> Self {
        let mut settings = Self::default();
        let Some(section) = options.and_then(|o| o.get("postgresSqlLsp")) else {
            return settings;
        };

        if let Some(schema) = section.get("defaultSchema").and_then(Value::as_str) {
            if !schema.is_empty() {
                settings.default_schema = schema.to_string();
            }
        }
        if let Some(validate) = section.get("validateOnChange").and_then(Value::as_bool) {
            settings.validate_on_change = validate;
        }

        settings
    }
}
