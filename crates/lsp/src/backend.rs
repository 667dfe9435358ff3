// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # LSP Backend Implementation
//!
//! This module provides the main LSP server backend using tower-lsp.
//!
//! ## Overview
//!
//! The backend handles:
//! - LSP protocol communication via tower-lsp
//! - Document lifecycle (open, change, close)
//! - Completion, signature help and live diagnostics
//! - The custom `set_connection` request that switches the active
//!   database session
//!
//! ## Architecture
//!
//! ```text
//! Client → LSP Backend → Document Store
//!                ↓
//!         Session Manager → Schema Cache
//!                ↓
//!      Validation / Completion / Signature engines
//! ```
//!
//! Only documents with `languageId == "postgres-sql"` are processed; the
//! editor-side client is configured to send exactly those, and anything
//! else is ignored here as a second line of defense.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, warn};

use postgres_sql_lsp_catalog::ConnectionDescriptor;

use crate::completion::CompletionEngine;
use crate::config::ServerSettings;
use crate::document::DocumentStore;
use crate::session_manager::{SessionManager, SwitchOutcome};
use crate::signature::signature_help;
use crate::validation::{is_current_version, validate_document};
use crate::{LANGUAGE_ID, SERVER_NAME};

/// Parameters of the custom `set_connection` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetConnectionParams {
    pub connection: ConnectionDescriptor,

    /// Document whose association triggered the switch; revalidated
    /// first when present.
    #[serde(default)]
    pub document_uri: Option<String>,
}

/// Response of the custom `set_connection` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetConnectionResponse {
    pub connected: bool,
}

/// LSP backend implementation
///
/// Main entry point for all LSP protocol operations.
/// Uses tower-lsp framework for protocol handling.
pub struct LspBackend {
    /// LSP client for sending notifications and requests
    client: Client,

    /// Document store for managing open documents
    documents: Arc<DocumentStore>,

    /// Server settings from initialization options
    settings: Arc<RwLock<ServerSettings>>,

    /// Owner of the active session and schema cache
    sessions: Arc<SessionManager>,
}

impl LspBackend {
    /// Create a backend with live database sessions.
    pub fn new(client: Client) -> Self {
        Self::with_sessions(client, Arc::new(SessionManager::with_live_factory()))
    }

    /// Create a backend over an existing session manager (tests inject a
    /// manager with a mock factory here).
    pub fn with_sessions(client: Client, sessions: Arc<SessionManager>) -> Self {
        Self {
            client,
            documents: Arc::new(DocumentStore::new()),
            settings: Arc::new(RwLock::new(ServerSettings::default())),
            sessions,
        }
    }

    /// Get the document store
    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Handler for the custom `set_connection` request.
    ///
    /// Delivered by the editor whenever the active document's connection
    /// association changes; idempotent for a descriptor that addresses
    /// the already-active database.
    pub async fn set_connection(
        &self,
        params: SetConnectionParams,
    ) -> Result<SetConnectionResponse> {
        info!(
            host = %params.connection.host,
            database = params.connection.database.as_deref().unwrap_or("<default>"),
            "set_connection received"
        );

        match self.sessions.set_connection(params.connection).await {
            Ok(SwitchOutcome::Unchanged) => Ok(SetConnectionResponse { connected: true }),
            Ok(SwitchOutcome::Connected) => {
                // diagnostics depend on the live database; refresh them
                self.revalidate_open_documents(params.document_uri).await;
                Ok(SetConnectionResponse { connected: true })
            }
            Err(e) => {
                warn!("connection failed: {e}");
                self.client
                    .show_message(MessageType::ERROR, format!("{e}"))
                    .await;
                Ok(SetConnectionResponse { connected: false })
            }
        }
    }

    /// Validate one document and publish the replacement diagnostics.
    ///
    /// The document version is captured before the (potentially slow)
    /// validation queries run; if the document has changed by the time
    /// the results are ready, the stale set is dropped instead of
    /// overwriting diagnostics for text the user no longer has.
    async fn validate_and_publish(&self, uri: Url) {
        let Some(document) = self.documents.get_document(&uri).await else {
            return;
        };
        if !document.is_postgres_sql() {
            return;
        }

        let snapshot_version = document.version();
        let Some(diagnostics) = validate_document(&self.sessions, &document).await else {
            // no session; diagnostics stay untouched until one exists
            return;
        };

        let current = self.documents.get_document(&uri).await;
        if is_current_version(snapshot_version, current.as_ref()) {
            self.client
                .publish_diagnostics(uri, diagnostics, Some(snapshot_version))
                .await;
        } else {
            debug!(%uri, "dropping stale diagnostics");
        }
    }

    /// Revalidate open documents after a connection switch, starting with
    /// the document that triggered it.
    async fn revalidate_open_documents(&self, first: Option<String>) {
        if let Some(uri) = first.as_deref().and_then(|u| Url::parse(u).ok()) {
            self.validate_and_publish(uri).await;
        }
        for uri in self.documents.list_uris().await {
            if first.as_deref() == Some(uri.as_str()) {
                continue;
            }
            self.validate_and_publish(uri).await;
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for LspBackend {
    /// Initialize the LSP server
    ///
    /// Called when the client starts the server.
    /// Returns server capabilities and configuration.
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("Initializing LSP server");
        info!("Client info: {:?}", params.client_info);

        let settings =
            ServerSettings::from_initialization_options(params.initialization_options.as_ref());
        info!(default_schema = %settings.default_schema, "server settings applied");
        *self.settings.write().await = settings;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                // documents are replaced wholesale on each edit
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),

                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![".".to_string(), "\"".to_string()]),
                    work_done_progress_options: WorkDoneProgressOptions {
                        work_done_progress: Some(false),
                    },
                    all_commit_characters: None,
                    completion_item: None,
                }),

                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
                    retrigger_characters: None,
                    work_done_progress_options: WorkDoneProgressOptions {
                        work_done_progress: Some(false),
                    },
                }),

                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: SERVER_NAME.to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    /// Initialized notification
    ///
    /// Called after `initialize` completes successfully.
    async fn initialized(&self, _params: InitializedParams) {
        info!("LSP server initialized successfully");
    }

    /// Shutdown the LSP server
    ///
    /// Called when the client is shutting down the server.
    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down LSP server");
        self.sessions.shutdown().await;
        Ok(())
    }

    /// Document opened notification
    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let uri = doc.uri.clone();

        if doc.language_id != LANGUAGE_ID {
            debug!(%uri, language = %doc.language_id, "ignoring non-postgres document");
            return;
        }

        info!(%uri, version = doc.version, "document opened");

        if let Err(e) = self
            .documents
            .open_document(uri.clone(), doc.text, doc.version, doc.language_id)
            .await
        {
            warn!("failed to open document: {e}");
            return;
        }

        self.validate_and_publish(uri).await;
    }

    /// Document changed notification
    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let identifier = params.text_document;
        let uri = identifier.uri.clone();

        if !self.documents.has_document(&uri).await {
            // never opened here (wrong language id); nothing to do
            return;
        }

        debug!(%uri, version = identifier.version, "document changed");

        if let Err(e) = self
            .documents
            .update_document(&identifier, &params.content_changes)
            .await
        {
            warn!("failed to update document: {e}");
            return;
        }

        if self.settings.read().await.validate_on_change {
            self.validate_and_publish(uri).await;
        }
    }

    /// Document closed notification
    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;

        if self.documents.close_document(&uri).await {
            info!(%uri, "document closed");
            // clear any published diagnostics for the closed document
            self.client.publish_diagnostics(uri, Vec::new(), None).await;
        }
    }

    /// Completion request
    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(document) = self.documents.get_document(&uri).await else {
            warn!(%uri, "completion for unknown document");
            return Ok(None);
        };

        let trigger_character = params
            .context
            .as_ref()
            .and_then(|c| c.trigger_character.clone());

        debug!(
            %uri,
            line = position.line,
            character = position.character,
            trigger = trigger_character.as_deref().unwrap_or("<invoked>"),
            "completion requested"
        );

        let cache = self.sessions.cache().await;
        let default_schema = self.settings.read().await.default_schema.clone();
        let engine = CompletionEngine::new(cache, default_schema);
        let items = engine.complete(&document, position, trigger_character.as_deref());

        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(CompletionResponse::Array(items)))
        }
    }

    /// Signature help request
    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(document) = self.documents.get_document(&uri).await else {
            return Ok(None);
        };

        let cache = self.sessions.cache().await;
        Ok(signature_help(&cache, &document, position))
    }
}
