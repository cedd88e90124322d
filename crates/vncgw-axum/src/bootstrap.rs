//! Axum server bootstrap - the composition root.
//!
//! This module is the only place where the gateway, its viewer page and the
//! HTTP listener are wired together.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use vncgw_core::{GatewayConfig, validate_config};
use vncgw_runtime::Gateway;

use crate::routes::create_router;
use crate::templates::HtmlViewerPage;

/// Everything the HTTP handlers need.
pub struct AxumContext {
    pub gateway: Arc<Gateway>,
    /// Root of the static viewer assets.
    pub assets_dir: PathBuf,
}

/// Validate `config` and build the gateway with its viewer page.
pub fn bootstrap(config: GatewayConfig) -> Result<AxumContext> {
    validate_config(&config).context("invalid gateway configuration")?;

    if !config.assets_dir.is_dir() {
        warn!(
            assets_dir = %config.assets_dir.display(),
            "Viewer assets directory not found; /core and /vendor will 404"
        );
    }
    let page = HtmlViewerPage::load(&config.assets_dir).with_context(|| {
        format!(
            "failed to read viewer template in {}",
            config.assets_dir.display()
        )
    })?;

    info!(
        target: "vncgw.config",
        port = config.port,
        app = %config.app.program.display(),
        lock_dir = %config.lock_dir.display(),
        assets_dir = %config.assets_dir.display(),
        max_display = config.max_display,
        bridge_host = ?config.bridge_host,
        poll_interval = ?config.poll_interval,
        poll_variance = ?config.poll_variance,
        quality = config.quality,
        password_required = config.password_required,
        "Gateway bootstrap resolved configuration"
    );

    let assets_dir = config.assets_dir.clone();
    Ok(AxumContext {
        gateway: Arc::new(Gateway::new(config, Arc::new(page))),
        assets_dir,
    })
}

/// Bootstrap and serve on `0.0.0.0:<config.port>` until ctrl-c.
pub async fn start_server(config: GatewayConfig) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.port);
    let ctx = bootstrap(config)?;

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("vncgw gateway listening on http://{}", addr);

    serve(ctx, listener, shutdown_signal()).await
}

/// Serve on `listener` until `shutdown` resolves, then disconnect every
/// session.
pub async fn serve<F>(ctx: AxumContext, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = Arc::new(ctx);
    let app = create_router(Arc::clone(&state));

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    state.gateway.shutdown().await;
    served.context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Received ctrl-c, shutting down");
}
