//! Marque smoke binary - runs a full session lifecycle against the
//! in-memory backend: activate, create, observe the feed echo merge to a
//! single row, then delete (optionally with an injected remote failure to
//! demonstrate rollback).

use std::sync::Arc;

use marque_client::config::Config;
use marque_client::memory::{MemoryBackend, StaticIdentity, TracingNotifier};
use marque_client::Session;
use marque_engine::SortKey;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marque_client=debug,marque_smoke=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(user = %config.user, fail_delete = config.fail_delete, "starting smoke run");

    let backend = Arc::new(MemoryBackend::new());
    let mut session = Session::new(
        backend.clone(),
        Arc::new(StaticIdentity::new(config.user.clone())),
        backend.clone(),
        Arc::new(TracingNotifier),
    );

    session.activate(&config.user).await?;

    let row = session
        .coordinator()
        .create("Rust documentation", "doc.rust-lang.org")
        .await?;
    tracing::info!(id = %row.id, url = %row.url, "created bookmark");

    // Let the feed echo for our own insert arrive and be de-duplicated.
    tokio::task::yield_now().await;

    let view = session.view("", SortKey::Newest).await;
    tracing::info!(count = view.len(), "view after create");

    if config.fail_delete {
        backend.fail_next_delete();
    }

    match session.coordinator().delete(&row.id).await {
        Ok(()) => tracing::info!(id = %row.id, "deleted bookmark"),
        Err(e) => tracing::warn!(error = %e, "delete failed; row was restored"),
    }

    let view = session.view("", SortKey::Newest).await;
    tracing::info!(count = view.len(), "final view");

    session.deactivate();
    Ok(())
}
