//! Shared handler state.

use geocatalog_core::GeoStore;
use tokio::task;

use crate::error::ApiError;

/// State cloned into every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    store: GeoStore,
}

impl AppState {
    /// Wrap a store handle.
    #[must_use]
    pub const fn new(store: GeoStore) -> Self {
        Self { store }
    }

    /// Run a synchronous store call on the blocking pool.
    pub(crate) async fn with_store<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&GeoStore) -> Result<T, geocatalog_core::GeoObjectError> + Send + 'static,
    {
        let store = self.store.clone();
        task::spawn_blocking(move || call(&store))
            .await
            .map_err(ApiError::Worker)?
            .map_err(ApiError::from)
    }
}
