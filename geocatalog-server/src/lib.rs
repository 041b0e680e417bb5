//! HTTP surface of the geocatalog.
//!
//! The router exposes the generic `/v1/geo_objects/{object_type}` routes
//! alongside typed routes for districts, streets, stations and bus stops.
//! Handlers run the synchronous store on Tokio's blocking pool and translate
//! [`geocatalog_core::GeoObjectError`] into status codes:
//!
//! | failure | status |
//! |---|---|
//! | unknown type or id | 404 |
//! | identity collision | 409 |
//! | invalid payload | 422 |
//! | store failure | 500 |

use geocatalog_core::GeoStore;
use log::{info, warn};
use tokio::{net::TcpListener, signal};

mod config;
mod error;
mod routes;
mod state;

pub use config::{DEFAULT_BIND, ServerConfig};
pub use error::{ApiError, ServerError};
pub use routes::{DEFAULT_LIMIT, router};
pub use state::AppState;

/// Serve the catalog until Ctrl-C is received.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] when the listener cannot be bound and
/// [`ServerError::Serve`] when the accept loop fails.
pub async fn serve(config: ServerConfig, store: GeoStore) -> Result<(), ServerError> {
    let addr = config.bind();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let app = router(AppState::new(store), &config);
    info!("serving catalog on http://{addr}{}", config.api_prefix());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|source| ServerError::Serve { source })?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
