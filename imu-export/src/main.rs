use clap::Parser;
use imu_export::batch::{BatchDriver, BatchReport};
use imu_export::logfile::FileLogService;
use imu_export::synthetic::{default_trial_name, SyntheticTrial};
use imu_export::{Cli, Command, LogService};
use log::{error, info};
use miette::{miette, IntoDiagnostic, Result};
use std::fs;
use std::path::Path;

fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .parse_default_env()
        .init();

    let service = FileLogService::new();
    info!(
        "imu-export {} using log service {}",
        imu_export::VERSION,
        service.version()
    );

    match args.command {
        Command::Export {
            input_root,
            output_root,
            profile,
            strict,
            report,
        } => {
            let profile = profile.resolve().into_diagnostic()?;
            let batch = BatchDriver::new(&service, &profile).run(&input_root, &output_root);
            print_report(&batch);

            if let Some(path) = report {
                write_report(&batch, &path)?;
            }
            if strict && batch.has_failures() {
                return Err(miette!(
                    "{} of {} exports failed",
                    batch.failed().count(),
                    batch.units.len()
                ));
            }
        }
        Command::List {
            input_root,
            profile,
        } => {
            let profile = profile.resolve().into_diagnostic()?;
            for listing in BatchDriver::new(&service, &profile).list(&input_root) {
                println!("{}", listing.log_path.display());
                match listing.devices {
                    Ok(devices) => {
                        for device in devices {
                            println!(
                                "  {}  {}  {} packets",
                                device
                                    .metadata
                                    .device_id
                                    .as_ref()
                                    .map(|id| id.to_string())
                                    .unwrap_or_default(),
                                device.metadata.product_code.as_deref().unwrap_or("-"),
                                device.packet_count
                            );
                        }
                    }
                    Err(e) => println!("  {}", e),
                }
            }
        }
        Command::Synth {
            output_dir,
            trial,
            sensors,
            packets,
            rate,
        } => {
            let trial = SyntheticTrial {
                name: trial.unwrap_or_else(default_trial_name),
                sensors,
                packets,
                update_rate: rate,
                first_counter: 0,
            };
            let path = trial.write(&output_dir).into_diagnostic()?;
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn print_report(report: &BatchReport) {
    println!(
        "{} log files, {} exported, {} failed",
        report.files_found,
        report.succeeded().count(),
        report.failed().count()
    );
    for file in report.failed_files() {
        error!("Failed: {}", file.display());
    }
}

fn write_report(report: &BatchReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&report.summary()).into_diagnostic()?;
    fs::write(path, json).into_diagnostic()?;
    info!("Report written to {}", path.display());
    Ok(())
}
