//! Error types emitted by the geocatalog CLI.

use std::{io, net::AddrParseError, sync::Arc};

use camino::Utf8PathBuf;
use geocatalog_core::GeoObjectError;
use geocatalog_data::ImportError;
use geocatalog_server::ServerError;
use thiserror::Error;

/// Errors emitted by the geocatalog CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The bind address does not parse as `host:port`.
    #[error("invalid bind address {value:?}: {source}")]
    InvalidBind {
        value: String,
        #[source]
        source: AddrParseError,
    },
    /// Installing the `log` to `tracing` bridge failed.
    #[error("failed to install log bridge: {0}")]
    LogBridge(#[from] log::SetLoggerError),
    /// Installing the tracing subscriber failed.
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
    /// The database's parent directory could not be created.
    #[error("failed to create the directory for {path:?}: {source}")]
    PrepareDatabase {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    /// Opening or provisioning the catalog database failed.
    #[error("failed to open catalog database {path:?}: {source}")]
    OpenStore {
        path: Utf8PathBuf,
        #[source]
        source: GeoObjectError,
    },
    /// The import aborted before loading any source.
    #[error("import failed: {0}")]
    Import(#[from] ImportError),
    /// The HTTP server failed to start or stopped with an error.
    #[error("server failed: {0}")]
    Server(#[from] ServerError),
    /// The async runtime could not be started.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] io::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] io::Error),
}
