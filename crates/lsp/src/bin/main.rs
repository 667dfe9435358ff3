use tower_lsp::{LspService, Server};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use postgres_sql_lsp_lsp::LspBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; stdout carries the LSP transport, so logs go
    // to stderr.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!("Starting PostgreSQL SQL LSP server");

    // Create stdin/stdout streams
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    // Create the LSP service with the custom connection-switch method
    let (service, socket) = LspService::build(LspBackend::new)
        .custom_method("set_connection", LspBackend::set_connection)
        .finish();

    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}
