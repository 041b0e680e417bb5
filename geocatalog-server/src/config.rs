//! Listener settings for the HTTP surface.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::ServerError;

/// Address used when none is configured.
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000);

/// Bind address and mount point of the API routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    bind: SocketAddr,
    api_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND,
            api_prefix: String::new(),
        }
    }
}

impl ServerConfig {
    /// Serve on `bind` with the API mounted at the root.
    #[must_use]
    pub const fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            api_prefix: String::new(),
        }
    }

    /// Mount the API routes under `prefix`.
    ///
    /// Leading and trailing slashes are normalised, so `"api"`, `"/api"` and
    /// `"/api/"` are equivalent. An empty prefix or `"/"` mounts at the root.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidPrefix`] when the prefix holds empty
    /// segments, whitespace or route parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use geocatalog_server::ServerConfig;
    ///
    /// let config = ServerConfig::default().with_api_prefix("api/")?;
    /// assert_eq!(config.api_prefix(), "/api");
    /// # Ok::<(), geocatalog_server::ServerError>(())
    /// ```
    pub fn with_api_prefix(mut self, prefix: &str) -> Result<Self, ServerError> {
        let trimmed = prefix.trim_matches('/');
        if trimmed.is_empty() {
            self.api_prefix.clear();
            return Ok(self);
        }
        let valid = trimmed.split('/').all(|segment| {
            !segment.is_empty()
                && !segment.starts_with([':', '*'])
                && !segment.chars().any(char::is_whitespace)
        });
        if !valid {
            return Err(ServerError::InvalidPrefix {
                prefix: prefix.to_owned(),
            });
        }
        self.api_prefix = format!("/{trimmed}");
        Ok(self)
    }

    /// Listener address.
    #[must_use]
    pub const fn bind(&self) -> SocketAddr {
        self.bind
    }

    /// Normalised API prefix; empty when mounted at the root.
    #[must_use]
    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }
}
