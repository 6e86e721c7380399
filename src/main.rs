//! chat-roster CLI - extract participant rosters from chat export files.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chat_roster::application::{
    choose_format, merge_events, pack_user_list, OutputFormat, RosterExtractor,
};
use chat_roster::cli::{parse_format, Cli, Commands};
use chat_roster::domain::{self, AppConfig, Event, ExportParser, ExtractStats, WorkbookWriter};
use chat_roster::infrastructure::{
    load_config, validate_workbook_bytes, CsvWorkbook, TelegramExportParser,
};

fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(cli: Cli) -> domain::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Extract {
            files,
            output,
            format,
        } => {
            let format =
                parse_format(&format).map_err(|e| domain::AppError::Config { message: e })?;
            cmd_extract(&files, output.as_deref(), format, &config)?;
        }
        Commands::Stats { files } => {
            cmd_stats(&files)?;
        }
        Commands::Validate { file } => {
            cmd_validate(&file)?;
        }
    }

    Ok(())
}

/// Parses the given export files into one merged event sequence.
fn parse_files(files: &[PathBuf]) -> domain::Result<Vec<Event>> {
    let parser = TelegramExportParser::new();
    let mut batches = Vec::with_capacity(files.len());

    for path in files {
        let name = path.display().to_string();
        let mut file = fs::File::open(path)
            .map_err(|e| domain::AppError::io(format!("Failed to open {name}"), e))?;
        let events = parser.parse(&mut file, &name)?;
        tracing::info!(events = events.len(), "parsed export file");
        batches.push(events);
    }

    Ok(merge_events(batches))
}

/// Extract command: roster to stdout or a workbook document.
fn cmd_extract(
    files: &[PathBuf],
    output: Option<&Path>,
    format: Option<OutputFormat>,
    config: &AppConfig,
) -> domain::Result<()> {
    let events = parse_files(files)?;
    let roster = RosterExtractor::new().extract(&events);
    let stats = ExtractStats::from_roster(&roster, files.len(), events.len());

    print_stats(&stats);

    if roster.participants.is_empty() {
        println!("{}", "No participants found.".yellow());
        return Ok(());
    }

    let format = format.unwrap_or_else(|| {
        choose_format(roster.participants.len(), config.output.inline_threshold)
    });

    match format {
        OutputFormat::List => {
            let chunks = pack_user_list(&roster.participants, config.output.max_message_len);
            let total = chunks.len();
            for (i, chunk) in chunks.iter().enumerate() {
                if total > 1 {
                    println!("{}", format!("--- part {}/{} ---", i + 1, total).dimmed());
                }
                println!("{chunk}");
            }
        }
        OutputFormat::Workbook => {
            let document = CsvWorkbook::new().serialize(&roster, Utc::now())?;
            let path =
                output.map_or_else(|| PathBuf::from("roster_export.csv"), Path::to_path_buf);
            fs::write(&path, document).map_err(|e| {
                domain::AppError::io(format!("Failed to write {}", path.display()), e)
            })?;
            println!(
                "{} Wrote {} participants to {}",
                "✓".green().bold(),
                roster.participants.len(),
                path.display()
            );
        }
    }

    Ok(())
}

/// Stats command.
fn cmd_stats(files: &[PathBuf]) -> domain::Result<()> {
    let events = parse_files(files)?;
    let roster = RosterExtractor::new().extract(&events);
    let stats = ExtractStats::from_roster(&roster, files.len(), events.len());
    print_stats(&stats);
    Ok(())
}

/// Validate command.
fn cmd_validate(file: &Path) -> domain::Result<()> {
    let bytes = fs::read(file)
        .map_err(|e| domain::AppError::io(format!("Failed to read {}", file.display()), e))?;
    validate_workbook_bytes(&bytes)?;
    println!(
        "{} {} carries all roster sections",
        "✓".green().bold(),
        file.display()
    );
    Ok(())
}

fn print_stats(stats: &ExtractStats) {
    println!(
        "{}\n  Files: {}\n  Events: {}\n  Participants: {}\n  Mentions: {}\n  Channels: {}",
        "Extraction".bold(),
        stats.files_parsed,
        stats.events_total.to_string().cyan(),
        stats.participants.to_string().green(),
        stats.mentions.to_string().blue(),
        stats.channels.to_string().yellow()
    );
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}