//! `serve` command implementation.

use std::net::SocketAddr;

use camino::Utf8PathBuf;
use clap::Parser;
use geocatalog_server::{DEFAULT_BIND, ServerConfig};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_API_PREFIX, ARG_BIND, ARG_DATABASE, CliError, ENV_SERVE_DATABASE, open_store};

/// CLI arguments for the `serve` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Serve the catalog's REST API. Settings can come from CLI \
                 flags, configuration files, or environment variables.",
    about = "Serve the catalog over HTTP"
)]
#[ortho_config(prefix = "GEOCATALOG")]
pub(crate) struct ServeArgs {
    /// Path to the SQLite catalog database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Address to listen on, as `host:port`.
    #[arg(long = ARG_BIND, value_name = "addr")]
    #[serde(default)]
    pub(crate) bind: Option<String>,
    /// Path prefix the API routes are mounted under.
    #[arg(long = ARG_API_PREFIX, value_name = "prefix")]
    #[serde(default)]
    pub(crate) api_prefix: Option<String>,
}

impl ServeArgs {
    fn into_config(self) -> Result<ServeConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ServeConfig::try_from(merged)
    }
}

/// Resolved `serve` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServeConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) server: ServerConfig,
}

impl TryFrom<ServeArgs> for ServeConfig {
    type Error = CliError;

    fn try_from(args: ServeArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_SERVE_DATABASE,
        })?;
        let bind = match args.bind {
            Some(value) => value
                .parse::<SocketAddr>()
                .map_err(|source| CliError::InvalidBind { value, source })?,
            None => DEFAULT_BIND,
        };
        let server = ServerConfig::new(bind)
            .with_api_prefix(args.api_prefix.as_deref().unwrap_or_default())?;
        Ok(Self { database, server })
    }
}

pub(crate) fn run_serve(args: ServeArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    let store = open_store(&config.database)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(geocatalog_server::serve(config.server, store))?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ServeConfig, CliError> {
    let merged = ServeArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ServeConfig::try_from(merged)
}
