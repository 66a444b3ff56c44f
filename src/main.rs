use std::path::PathBuf;

use anyhow::Context;
use chrono::Month;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use telemetry_analyzer::report::{self, format_percentage, DashboardView};
use telemetry_analyzer::{Session, UploadedFile};

#[derive(Parser)]
#[command(name = "telemetry-analyzer")]
#[command(about = "Battery and signal error analysis for device telemetry exports")]
#[command(long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Input {
    /// Uploaded files; anything that is not .csv is skipped
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct Filters {
    /// Month to analyse (defaults to the earliest month present)
    #[arg(long, value_parser = parse_month)]
    month: Option<Month>,
    /// Restrict the time series and status counts to one device
    #[arg(long)]
    device: Option<String>,
    /// Include the filtered rows
    #[arg(long)]
    show_raw: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the months present in the data
    Months {
        #[command(flatten)]
        input: Input,
    },
    /// List device ids in first-seen order
    Devices {
        #[command(flatten)]
        input: Input,
    },
    /// Print the per-device error table for a month
    Summary {
        #[command(flatten)]
        input: Input,
        #[arg(long, value_parser = parse_month)]
        month: Option<Month>,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        input: Input,
        #[command(flatten)]
        filters: Filters,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print the dashboard view as JSON
    Export {
        #[command(flatten)]
        input: Input,
        #[command(flatten)]
        filters: Filters,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Months { input } => {
            let session = open_session(&input)?;
            for month in session.months() {
                println!("{}", month.name());
            }
        }
        Commands::Devices { input } => {
            let session = open_session(&input)?;
            for device in session.devices() {
                println!("{device}");
            }
        }
        Commands::Summary { input, month } => {
            let mut session = open_session(&input)?;
            if let Some(month) = month {
                session.select_month(month);
            }
            let Some(view) = session.view() else {
                println!("No readings found.");
                return Ok(());
            };

            if view.summary.is_empty() {
                println!("No readings found for {}.", view.month.name());
                return Ok(());
            }

            println!("Devices to replace for {}:", view.month.name());
            for row in &view.summary {
                println!(
                    "{:>3}. {} replace {}% battery errors {}% signal errors {}%",
                    row.index,
                    row.device,
                    row.replace.text,
                    row.battery_error.text,
                    row.signal_error.text
                );
            }
        }
        Commands::Report {
            input,
            filters,
            out,
        } => {
            let session = filtered_session(&input, filters)?;
            let view = session.view().context("no readings to report on")?;
            std::fs::write(&out, report::build_report(&view))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "Report for {} written to {}{}.",
                view.month.name(),
                out.display(),
                worst_replace_clause(&view)
            );
        }
        Commands::Export { input, filters } => {
            let session = filtered_session(&input, filters)?;
            let view = session.view().context("no readings to export")?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }

    Ok(())
}

fn open_session(input: &Input) -> anyhow::Result<Session> {
    let files = input
        .files
        .iter()
        .map(|path| {
            UploadedFile::from_path(path)
                .with_context(|| format!("failed to read {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut session = Session::new();
    session.upload(&files)?;
    for name in session.skipped() {
        eprintln!("Skipped {name}: not a CSV file.");
    }
    Ok(session)
}

fn filtered_session(input: &Input, filters: Filters) -> anyhow::Result<Session> {
    let mut session = open_session(input)?;
    if let Some(month) = filters.month {
        session.select_month(month);
    }
    session.select_device(filters.device);
    session.set_show_raw(filters.show_raw);
    Ok(session)
}

/// Empty when the month has no rows to rank.
fn worst_replace_clause(view: &DashboardView) -> String {
    let worst = view
        .summary
        .iter()
        .map(|r| r.replace.value)
        .fold(f64::NAN, f64::max);
    if worst.is_nan() {
        String::new()
    } else {
        format!(" (worst replace rate {}%)", format_percentage(worst))
    }
}

fn parse_month(value: &str) -> Result<Month, String> {
    value
        .parse::<Month>()
        .map_err(|_| format!("unknown month `{value}`"))
}

/// Logs go to stderr; `RUST_LOG` takes precedence over `--log-level`.
fn init_tracing(log_level: &str) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_analyzer::classify::enrich;
    use telemetry_analyzer::{Reading, Selection};

    fn sample_view(month: Month) -> DashboardView {
        let data = enrich(&[Reading {
            device: "A1".to_string(),
            last_signal: chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
            battery: 1.0,
            signal: 25.0,
            extra: Vec::new(),
        }]);
        let selection = Selection {
            month,
            device: None,
            show_raw: false,
        };
        DashboardView::build(&data, &selection)
    }

    #[test]
    fn worst_replace_rate_reported_when_rows_exist() {
        assert_eq!(
            worst_replace_clause(&sample_view(Month::March)),
            " (worst replace rate 100.00%)"
        );
    }

    #[test]
    fn worst_replace_rate_omitted_for_empty_month() {
        assert_eq!(worst_replace_clause(&sample_view(Month::June)), "");
    }

    #[test]
    fn month_names_parse_case_insensitively() {
        assert_eq!(parse_month("march"), Ok(Month::March));
        assert!(parse_month("Smarch").is_err());
    }
}
