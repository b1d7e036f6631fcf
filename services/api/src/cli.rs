use crate::demo::{run_demo, DemoArgs};
use crate::infra::{open_engine, print_json, read_json};
use crate::server;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use traffic_ledger::config::AppConfig;
use traffic_ledger::engine::LinkedDataDocument;
use traffic_ledger::error::AppError;
use traffic_ledger::registry::NewVehicleImage;
use traffic_ledger::OperationResult;

#[derive(Parser, Debug)]
#[command(
    name = "Traffic Ledger",
    about = "Run and administer the vehicle, sticker, and violation ledger",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print aggregate statistics for the configured data directory
    Stats,
    /// Link stickers, vehicles, and violations and backfill sticker-derived vehicles
    Reconcile,
    /// Recompute violation counts and risk status for every vehicle
    Recompute,
    /// Violation count and fine totals for an inclusive date range
    PeriodStats {
        /// First day of the period (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,
        /// Last day of the period (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,
    },
    /// Attach a photo to a vehicle record
    AddImage {
        /// Vehicle id
        id: String,
        url: String,
        /// Image category, `general` when omitted
        #[arg(long = "type")]
        image_type: Option<String>,
    },
    /// Bulk-load records into the configured data directory
    Import {
        #[command(subcommand)]
        command: ImportCommand,
    },
    /// Write the linked JSON document, or one collection as CSV
    Export(ExportArgs),
    /// Run an in-memory walkthrough of the main workflows
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ImportCommand {
    /// Vehicle rows from a CSV export (English or Arabic headers)
    Vehicles { path: PathBuf },
    /// Sticker documents from a JSON array
    Stickers { path: PathBuf },
    /// Replace every collection with a previous export
    Data { path: PathBuf },
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug, Default)]
struct ExportArgs {
    /// What to export
    #[arg(long, value_enum, default_value_t)]
    target: ExportTarget,
    /// Write to a file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum ExportTarget {
    /// Every collection plus statistics, as JSON
    #[default]
    Data,
    /// Vehicles as CSV
    Vehicles,
    /// Violations as CSV
    Violations,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        command => run_offline(command),
    }
}

fn run_offline(command: Command) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let engine = open_engine(&config)?;

    match command {
        Command::Stats => print_json(&AppError::from_outcome(engine.get_statistics())?),
        Command::Reconcile => print_json(&AppError::from_outcome(engine.reconcile())?),
        Command::Recompute => {
            let changed = AppError::from_outcome(engine.recompute_all())?;
            println!("{changed} vehicle(s) reclassified");
            Ok(())
        }
        Command::PeriodStats { from, to } => print_json(&AppError::from_outcome(
            engine.violation_statistics_for_period(from, to),
        )?),
        Command::AddImage {
            id,
            url,
            image_type,
        } => {
            let image = NewVehicleImage {
                url: Some(url),
                image_type,
            };
            print_json(&AppError::from_outcome(engine.add_vehicle_image(&id, image))?)
        }
        Command::Import {
            command: ImportCommand::Vehicles { path },
        } => {
            let file = File::open(&path)?;
            print_json(&AppError::from_outcome(engine.import_vehicles_csv(file))?)
        }
        Command::Import {
            command: ImportCommand::Stickers { path },
        } => {
            let documents: Vec<Value> = read_json(&path)?;
            print_json(&AppError::from_outcome(engine.import_stickers(documents))?)
        }
        Command::Import {
            command: ImportCommand::Data { path },
        } => {
            let document: LinkedDataDocument = read_json(&path)?;
            print_json(&AppError::from_outcome(
                engine.import_linked_data(document.data),
            )?)
        }
        Command::Export(ExportArgs {
            target: ExportTarget::Data,
            output,
        }) => {
            let export = AppError::from_outcome(engine.export_linked_data())?;
            match output {
                Some(path) => {
                    fs::write(&path, serde_json::to_vec_pretty(&export)?)?;
                    println!("exported to {}", path.display());
                    Ok(())
                }
                None => print_json(&export),
            }
        }
        Command::Export(ExportArgs {
            target: ExportTarget::Vehicles,
            output,
        }) => write_csv(output, |writer| engine.export_vehicles_csv(writer)),
        Command::Export(ExportArgs {
            target: ExportTarget::Violations,
            output,
        }) => write_csv(output, |writer| engine.export_violations_csv(writer)),
        Command::Serve(_) | Command::Demo(_) => Ok(()),
    }
}

fn write_csv<F>(output: Option<PathBuf>, export: F) -> Result<(), AppError>
where
    F: FnOnce(Box<dyn io::Write>) -> OperationResult<usize>,
{
    match output {
        Some(path) => {
            let rows = AppError::from_outcome(export(Box::new(File::create(&path)?)))?;
            println!("{rows} row(s) exported to {}", path.display());
        }
        None => {
            AppError::from_outcome(export(Box::new(io::stdout().lock())))?;
        }
    }
    Ok(())
}
