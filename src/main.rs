use std::{path::Path, process::ExitCode};

use anyhow::{Context, Error};
use clap::Parser;
use log::{error, info, LevelFilter};
use serde::Serialize;

use diskplan::{
    build_inventory, build_model, build_settings,
    cli::{Cli, Commands},
    input,
    issues::Issue,
    resolve_config, validation, FileLog, MultiLogger, Resolution,
};
use diskplan_api::{
    devicegraph::DeviceGraph,
    error::{DiskplanError, InternalError, ReportError},
    product::ProductConfig,
    wire,
};

/// Command output with the issues found while resolving.
#[derive(Serialize)]
struct Report<T> {
    #[serde(flatten)]
    body: T,
    issues: Vec<Issue>,
}

fn print_json(value: &impl Serialize) -> Result<(), DiskplanError> {
    let json = serde_json::to_string_pretty(value).structured(InternalError::SerializeOutput)?;
    println!("{json}");
    Ok(())
}

/// Loads the inputs of a resolution and resolves the layout.
fn resolve(
    args: &Cli,
    config: &Path,
    devicegraph: &Path,
) -> Result<(Resolution, DeviceGraph, ProductConfig), DiskplanError> {
    let product = input::load_product(args.product.as_deref())?;
    let config = input::load_config(config, &product)?;
    let graph = input::load_device_graph(devicegraph)?;

    let resolution = resolve_config(&config, &graph);
    resolution.issues.iter().for_each(Issue::log);
    Ok((resolution, graph, product))
}

fn run_diskplan(args: &Cli) -> Result<(), DiskplanError> {
    info!("Diskplan version: {}", diskplan::DISKPLAN_VERSION);
    info!("Running command '{}'", args.command);

    match &args.command {
        Commands::Resolve {
            config,
            devicegraph,
            solved,
        } => {
            let (Resolution { config, issues }, graph, product) =
                resolve(args, config, devicegraph)?;
            if *solved {
                print_json(&Report {
                    body: wire::export_config(&config),
                    issues,
                })
            } else {
                print_json(&Report {
                    body: build_model(&config, &graph, &product),
                    issues,
                })
            }
        }

        Commands::Settings {
            config,
            devicegraph,
        } => {
            let (Resolution { config, issues }, graph, _) = resolve(args, config, devicegraph)?;
            print_json(&Report {
                body: build_settings(&config, &graph),
                issues,
            })
        }

        Commands::Inventory { devicegraph } => {
            let graph = input::load_device_graph(devicegraph)?;
            print_json(&build_inventory(&graph))
        }

        Commands::Normalize { config } => {
            let product = input::load_product(args.product.as_deref())?;
            let config = input::load_config(config, &product)?;
            print_json(&wire::export_config(&config))
        }

        Commands::Validate { config } => {
            let product = input::load_product(args.product.as_deref())?;
            validation::validate_config_file(config, &product)
        }
    }
}

fn setup_logging(args: &Cli) -> Result<(), Error> {
    let mut multilogger = MultiLogger::new()
        // Regular env_logger output to stderr
        .with_logger(Box::new(
            env_logger::builder()
                .format_timestamp(None)
                .filter_level(args.verbosity)
                .build(),
        ))
        // One trace line per converted device is only useful when debugging
        // the inventory itself
        .with_global_filter("diskplan::inventory", LevelFilter::Debug);

    if let Some(log_file) = &args.log_file {
        multilogger.add_logger(FileLog::new(log_file).into_logger());
    }

    multilogger.init().context("Logger already registered")?;

    Ok(())
}

fn main() -> ExitCode {
    let args = Cli::parse();

    if let Err(e) = setup_logging(&args) {
        eprintln!("Failed to initialize logging: {e:?}");
        return ExitCode::from(1);
    }

    if let Err(e) = run_diskplan(&args) {
        error!("Command '{}' failed: {e:?}", args.command);
        return ExitCode::from(2);
    }

    ExitCode::SUCCESS
}
