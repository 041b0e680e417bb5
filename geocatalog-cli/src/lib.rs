//! Command-line interface for running and seeding the geocatalog.
#![forbid(unsafe_code)]

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use geocatalog_core::GeoStore;

mod error;
mod import;
mod logging;
mod serve;

pub use error::CliError;

use import::ImportArgs;
use serve::ServeArgs;

const ARG_DATABASE: &str = "database";
const ARG_BIND: &str = "bind";
const ARG_API_PREFIX: &str = "api-prefix";
const ARG_DATA_DIR: &str = "data-dir";
const ENV_SERVE_DATABASE: &str = "GEOCATALOG_CMDS_SERVE_DATABASE";
const ENV_IMPORT_DATABASE: &str = "GEOCATALOG_CMDS_IMPORT_DATABASE";

/// Run the geocatalog CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    logging::init(cli.verbose, cli.debug)?;
    match cli.command {
        Command::Serve(args) => serve::run_serve(args),
        Command::Import(args) => import::run_import(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "geocatalog",
    about = "Geospatial object catalog backed by SQLite",
    version
)]
struct Cli {
    /// Enable verbose (INFO level) logging output.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Enable debug (DEBUG level) logging output.
    #[arg(short, long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the catalog over HTTP.
    Serve(ServeArgs),
    /// Replace the catalog's contents with the bundled GeoJSON layers.
    Import(ImportArgs),
}

/// Open the catalog at `path`, creating its parent directory first.
fn open_store(path: &Utf8Path) -> Result<GeoStore, CliError> {
    geocatalog_data::fs::ensure_parent_dir(path).map_err(|source| {
        CliError::PrepareDatabase {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let store = GeoStore::open(path.as_std_path()).map_err(|source| CliError::OpenStore {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("opened catalog store at {}", store.path().display());
    Ok(store)
}

#[cfg(test)]
mod tests;
