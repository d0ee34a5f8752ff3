//! # CLI interface
//!
//! Argument parsing and async entry points for the two binaries:
//!
//! - `import-data -c <config>`: upload files into eCloud ([`run_import_cli`]).
//! - `prepare-all -c <config>`: prepare the processing services, submit the
//!   processing task, then run the import ([`run_prepare_all_cli`]).
//!
//! All business logic lives in [`ecloud_core`]; this module wires real
//! clients to it and prints progress for the operator.
//!
//! ## Exit status
//! The entry points return an error only for configuration-stage failures.
//! Binaries map those, as well as `--help` and bad arguments, to status 2
//! (see [`parse_args`]). Failed remote calls and commands are logged and
//! never change the exit status.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use ecloud_core::config::ImportConfig;
use ecloud_core::deploy::{prepare_all, DeployReport};
use ecloud_core::import::{run_import, ImportReport};

use crate::client::EcloudClient;
use crate::load_config::{load_deploy_config, load_import_config};
use crate::provisioner::ServiceProvisioner;

/// Exit status for help, bad arguments and configuration failures.
pub const USAGE_EXIT_CODE: i32 = 2;

/// Upload files into eCloud: providers, datasets, records, representations and files.
#[derive(Debug, Parser)]
#[command(name = "import-data", version)]
pub struct ImportCli {
    /// Path to the JSON import configuration
    #[arg(short = 'c', long = "config-file")]
    pub config_file: PathBuf,
}

/// Prepare Solr, Elasticsearch, Kafka and Storm, submit the processing task and import data.
#[derive(Debug, Parser)]
#[command(name = "prepare-all", version)]
pub struct PrepareAllCli {
    /// Path to the JSON deployment configuration
    #[arg(short = 'c', long = "config-file")]
    pub config_file: PathBuf,
}

/// Parse the process arguments. Help, version and usage errors exit with [`USAGE_EXIT_CODE`].
pub fn parse_args<T: Parser>() -> T {
    match T::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            if !matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) {
                eprintln!("Use --help for more information.");
            }
            std::process::exit(USAGE_EXIT_CODE);
        }
    }
}

/// Body of `import-data`.
pub async fn run_import_cli(cli: ImportCli) -> Result<ImportReport> {
    tracing::info!("trace_initialised");
    let config = load_import_config(&cli.config_file)?;
    let client = EcloudClient::new(&config)?;
    Ok(import(&client, &config).await)
}

/// Body of `prepare-all`.
///
/// The import configuration named by `importConfigFile` is loaded, and its
/// client built, before any service is touched, so a broken one fails fast.
/// A relative path is resolved against the directory of the deployment
/// configuration.
pub async fn run_prepare_all_cli(
    cli: PrepareAllCli,
) -> Result<(DeployReport, Option<ImportReport>)> {
    tracing::info!("trace_initialised");
    let config = load_deploy_config(&cli.config_file)?;

    let base = cli.config_file.parent().unwrap_or_else(|| Path::new(""));
    let pending_import = match config.import_config_path(base) {
        Some(path) => {
            let import_config = load_import_config(&path)
                .with_context(|| format!("Cannot load import config {}", path.display()))?;
            let client = EcloudClient::new(&import_config)
                .with_context(|| format!("Cannot load import config {}", path.display()))?;
            Some((client, import_config))
        }
        None => None,
    };

    let provisioner = ServiceProvisioner::new(config.proxy.as_deref())?;
    let report = prepare_all(&provisioner, &config).await;
    for (step, failure) in report.failures() {
        println!("Step {step:?} failed: {failure}");
    }
    if let Some(location) = &report.task_location {
        println!("Submitted task url: {location}");
    }

    let imported = match &pending_import {
        Some((client, import_config)) => Some(import(client, import_config).await),
        None => None,
    };
    Ok((report, imported))
}

async fn import(client: &EcloudClient, config: &ImportConfig) -> ImportReport {
    println!("Data import is started");
    let report = run_import(client, config).await;

    for record in &report.records {
        let name = record.record_id.as_deref().unwrap_or("<generated>");
        match &record.result {
            Ok(stored) => println!(
                "Record {name} stored as {} ({} representation(s))",
                stored.cloud_id.id,
                stored.representations.len()
            ),
            Err(e) => println!("Record {name} failed: {e}"),
        }
    }
    println!(
        "Data import finished: {} record(s) stored, {} failed",
        report.stored(),
        report.failed()
    );
    tracing::info!(
        provider_id = %report.provider_id,
        data_set_id = ?report.data_set_id,
        stored = report.stored(),
        failed = report.failed(),
        "Import complete"
    );
    report
}
