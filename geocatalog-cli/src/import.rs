//! `import` command implementation.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use geocatalog_data::{DEFAULT_DATA_DIR, ImportReport, default_sources};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_DATA_DIR, ARG_DATABASE, CliError, ENV_IMPORT_DATABASE, open_store};

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Clear the catalog and load the GeoJSON layers found in the \
                 data directory. Layers that are missing or unreadable are \
                 reported and skipped.",
    about = "Seed the catalog from GeoJSON layers"
)]
#[ortho_config(prefix = "GEOCATALOG")]
pub(crate) struct ImportArgs {
    /// Path to the SQLite catalog database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Directory holding the GeoJSON layers.
    #[arg(long = ARG_DATA_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) data_dir: Option<Utf8PathBuf>,
}

impl ImportArgs {
    fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

/// Resolved `import` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) data_dir: Utf8PathBuf,
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_IMPORT_DATABASE,
        })?;
        let data_dir = args
            .data_dir
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATA_DIR));
        Ok(Self { database, data_dir })
    }
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), CliError> {
    let config = args.into_config()?;
    let mut stdout = std::io::stdout().lock();
    run_import_with(&config, &mut stdout)
}

pub(crate) fn run_import_with(
    config: &ImportConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let store = open_store(&config.database)?;
    let report = geocatalog_data::run_import(&store, &config.data_dir, &default_sources())?;
    write_import_report(writer, &report)
}

fn write_import_report(writer: &mut dyn Write, report: &ImportReport) -> Result<(), CliError> {
    for source in &report.sources {
        writeln!(
            writer,
            "{}: {} ({} rows, {} of {} features skipped)",
            source.file,
            source.outcome,
            source.rows_committed,
            source.features_skipped,
            source.features_read,
        )
        .map_err(CliError::WriteOutput)?;
    }
    writeln!(
        writer,
        "imported {} rows, cleared {}",
        report.rows_committed(),
        report.rows_cleared
    )
    .map_err(CliError::WriteOutput)
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ImportConfig, CliError> {
    let merged = ImportArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ImportConfig::try_from(merged)
}
