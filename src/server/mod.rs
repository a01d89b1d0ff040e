//! HTTP/JSON boundary
//!
//! | Route | Operation |
//! |---|---|
//! | `POST /v1/fetch` | fetch one page through the queue |
//! | `POST /v1/discover` | find sub-sites of a base site |
//! | `POST /v1/map` | breadth-first site map |
//! | `POST /v1/capture` | export pages as documents |
//! | `GET /health` | liveness (no api key needed) |
//! | `GET /v1/status` | counters and occupancy |

pub mod error;
pub mod handlers;
pub mod middleware;

pub use error::{ApiError, ApiFailure};
pub use middleware::RequestId;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::browser_pool::EngineLauncher;
use crate::renderer::{DocumentRenderer, PageRenderer};
use crate::service::ServiceContext;

/// Every route with authentication and correlation ids applied
pub fn router<R, L>(service: Arc<ServiceContext<R, L>>) -> Router
where
    R: PageRenderer + DocumentRenderer,
    L: EngineLauncher,
{
    let api_key: Option<Arc<str>> = service
        .config()
        .server
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(Arc::from);

    Router::new()
        .route("/health", get(handlers::health::<R, L>))
        .route("/v1/status", get(handlers::status::<R, L>))
        .route("/v1/fetch", post(handlers::fetch::<R, L>))
        .route("/v1/discover", post(handlers::discover::<R, L>))
        .route("/v1/map", post(handlers::map::<R, L>))
        .route("/v1/capture", post(handlers::capture::<R, L>))
        // Later layers wrap earlier ones: ids are assigned before auth runs
        .layer(axum::middleware::from_fn_with_state(api_key, middleware::require_api_key))
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Serve until `shutdown` resolves, then shut the service down
pub async fn serve<R, L>(
    service: Arc<ServiceContext<R, L>>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()>
where
    R: PageRenderer + DocumentRenderer,
    L: EngineLauncher,
{
    let addr = service.config().server.bind;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, router(Arc::clone(&service)))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    service.shutdown().await;
    Ok(())
}
