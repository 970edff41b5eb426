//! formgate server binary.
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! formgate --config config.yaml
//!
//! # With environment variables only
//! FORMGATE_SERVER__PORT=8080 formgate
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use formgate_api::auth::StaticTokenVerifier;
use formgate_api::http::{create_router_with_body_limit, AppState};
use formgate_api::middleware::{cors_layer, RequestIdLayer, RequestLoggingLayer};
use formgate_domain::orgset::OrgSet;
use formgate_domain::principal::Claims;
use formgate_server::config::{AuthSettings, LoggingSettings};
use formgate_server::ServerConfig;
use formgate_storage::{DocumentStore, MemoryDocumentStore};

/// formgate - org-scoped forms and records API
#[derive(Parser, Debug)]
#[command(name = "formgate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = args.config {
        ServerConfig::load(&config_path)?
    } else {
        ServerConfig::from_env()?
    };

    init_logging(&config.logging);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting formgate server");

    match config.storage.backend.as_str() {
        "memory" => {
            info!("Using in-memory storage backend");
            let store = MemoryDocumentStore::new_shared();
            run_server(store, &config).await
        }
        other => anyhow::bail!("unsupported storage backend: {other}"),
    }
}

fn init_logging(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.clone()));

    if settings.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run_server<S: DocumentStore>(store: Arc<S>, config: &ServerConfig) -> anyhow::Result<()> {
    let verifier = Arc::new(StaticTokenVerifier::new(static_claims_table(&config.auth)));
    if config.auth.static_tokens.is_empty() {
        info!("No static tokens configured; every request will be rejected until an identity provider is wired in");
    }

    let state = AppState::with_audit_settings(store, verifier, config.audit.clone());
    let app = create_router_with_body_limit(state, config.server.body_limit_bytes)
        .layer(RequestLoggingLayer::new())
        .layer(RequestIdLayer::new())
        .layer(cors_layer());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "formgate API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

fn static_claims_table(auth: &AuthSettings) -> HashMap<String, Claims> {
    auth.static_tokens
        .iter()
        .map(|(token, entry)| {
            (
                token.clone(),
                Claims {
                    uid: entry.uid.clone(),
                    email: entry.email.clone(),
                    role: entry.role.clone(),
                    org: Some(OrgSet::Many(entry.org.clone())),
                },
            )
        })
        .collect()
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown handler");
    }
}
