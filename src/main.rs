use clap::Parser;
use console::style;
use std::process::ExitCode;
use treesync::commands::report::{format_error_summary, format_manifest, format_summary};
use treesync::config::Cli;
use treesync::{Config, RunSummary};

/// Exit status for runs that never got past setup
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    match try_main() {
        Ok(summary) => ExitCode::from(summary.exit_code() as u8),
        Err(err) => {
            eprintln!("{} {:#}", style("error:").red().bold(), err);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn try_main() -> anyhow::Result<RunSummary> {
    let cli = Cli::parse();

    // Convert CLI args to Config - this validates immediately
    let config = Config::try_from(cli)?;
    treesync::logging::init_logging(config.verbose)?;

    if !config.json_report {
        eprintln!(
            "{} v{} ({} -> {})",
            style("treesync").cyan().bold(),
            treesync::VERSION,
            config.source.display(),
            config.destination.display()
        );
    }

    let json_report = config.json_report;
    let summary = treesync::commands::sync::run(config)?;

    if json_report {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        if let Some(manifest) = &summary.manifest {
            println!("{}", format_manifest(manifest));
        }
        println!("{}", format_summary(&summary));
        if !summary.errors.is_empty() {
            println!("{}", format_error_summary(&summary.errors));
        }
    }

    Ok(summary)
}
