mod redirect;
mod status;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::handler::Handler;
use axum::routing::get;
use axum::Router;
use log::{info, warn};
use reqwest::Url;
use tokio::net::TcpListener;

use crate::mirror::{SnapshotBuilder, SnapshotStore};
use crate::refresh::RefreshLoop;
use crate::selector::{SelectionPolicy, Selector};
use redirect::RedirectState;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub source: Url,
    pub interval: Duration,
    pub min_completion: f64,
    pub host: String,
    pub port: u16,
    pub fetch_timeout: Duration,
    pub selection: SelectionPolicy,
}

/// Routes for the redirect endpoints and the status page.
pub fn router(store: Arc<SnapshotStore>, policy: SelectionPolicy) -> Router {
    let global = RedirectState::new(store.clone(), Selector::Global(policy));
    let country = RedirectState::new(store.clone(), Selector::Country(policy));

    Router::new()
        .route("/status", get(status::status))
        .with_state(store)
        .nest_service("/global", redirect::redirect.with_state(global))
        .nest_service("/country", redirect::redirect.with_state(country))
}

/// Starts the refresh loop, waits for the first snapshot, then serves until Ctrl-C.
pub async fn serve(config: ServiceConfig) -> Result<()> {
    let store = Arc::new(SnapshotStore::new());
    let builder = SnapshotBuilder::new(
        config.source.clone(),
        config.min_completion,
        config.fetch_timeout,
    )?;
    let mut refresh = RefreshLoop::spawn(builder, store.clone(), config.interval);

    tokio::select! {
        ready = refresh.ready() => {
            if !ready {
                bail!("mirror refresh stopped before the first snapshot was published");
            }
        }
        _ = shutdown_signal() => {
            info!("shutdown requested before the first snapshot was ready");
            return Ok(());
        }
    }

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to listen on {}:{}", config.host, config.port))?;
    info!(
        "init finished, listening on {} (selection: {})",
        listener.local_addr()?,
        config.selection
    );

    axum::serve(listener, router(store, config.selection))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    refresh.abort();
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}
