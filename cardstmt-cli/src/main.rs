use anyhow::{Context, Result, bail};
use cardstmt_core::{BankId, StatementRecord};
use cardstmt_ingest::{Document, DocumentSource, Outcome, auto_parse, detect_bank, open_document, parse};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{Config, OutputFormat, init_config, load_config};

#[derive(Parser, Debug)]
#[command(
    name = "cardstmt",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CARDSTMT_BUILD_SHA"), ")"),
    about = "Extract header fields and transactions from credit card statement PDFs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse one statement and print its fields
    Parse {
        file: PathBuf,

        /// Issuer profile to use (icici, hdfc, sbi, kotak, amex); detected when omitted
        #[arg(long)]
        bank: Option<BankId>,

        /// Print the record as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Also write the transactions to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Print which supported bank issued a statement
    Detect { file: PathBuf },

    /// Detect and parse several statements concurrently
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Manage ~/.cardstmt/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Parse { file, bank, json, csv } => {
            let cfg = load_config()?;
            parse_one(&cfg, &file, bank, json, csv.as_deref())?;
        }

        Command::Detect { file } => {
            detect(&file)?;
        }

        Command::Batch { files, json } => {
            let cfg = load_config()?;
            run_batch(&cfg, files, json).await?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => init_config()?,
        },
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_one(cfg: &Config, file: &Path, bank: Option<BankId>, json: bool, csv: Option<&Path>) -> Result<()> {
    if !file.exists() {
        bail!("statement not found: {}", file.display());
    }

    let record = match bank {
        Some(bank) => parse(bank, file),
        None => match auto_parse(file) {
            Outcome::Parsed(record) => record,
            Outcome::Unsupported => bail!(
                "no supported bank detected in {} (pass --bank to choose one)",
                file.display()
            ),
            Outcome::Unreadable(failure) => bail!("{}: {failure}", file.display()),
        },
    };
    if let Some(failure) = &record.error {
        bail!("{}: {failure}", file.display());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json || cfg.output.format == OutputFormat::Json {
        serde_json::to_writer_pretty(&mut out, &record).context("serialize record")?;
        writeln!(out)?;
    } else {
        render::write_table(&mut out, &record, cfg.output.show_transactions)?;
    }

    if let Some(path) = csv {
        export_csv(&record, path)?;
    }
    Ok(())
}

fn export_csv(record: &StatementRecord, path: &Path) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    render::write_csv(BufWriter::new(f), &record.transactions)?;
    info!(path = %path.display(), rows = record.transactions.len(), "wrote transactions CSV");
    Ok(())
}

fn detect(file: &Path) -> Result<()> {
    let doc = open_document(&DocumentSource::from(file)).with_context(|| format!("open {}", file.display()))?;
    let text = doc.extract_text().with_context(|| format!("read {}", file.display()))?;
    match detect_bank(&text) {
        Some(bank) => println!("{} ({})", bank.id(), bank.display_name()),
        None => println!("unsupported"),
    }
    Ok(())
}

#[derive(Serialize)]
struct BatchEntry {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<StatementRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl BatchEntry {
    fn from_outcome(file: &Path, outcome: Outcome) -> Self {
        let (record, error) = match outcome {
            Outcome::Parsed(record) => match record.error.as_ref().map(ToString::to_string) {
                Some(error) => (None, Some(error)),
                None => (Some(record), None),
            },
            Outcome::Unsupported => (None, Some("no supported bank detected".to_string())),
            Outcome::Unreadable(failure) => (None, Some(failure.to_string())),
        };
        Self {
            file: file.display().to_string(),
            record,
            error,
        }
    }
}

async fn run_batch(cfg: &Config, files: Vec<PathBuf>, json: bool) -> Result<()> {
    let permits = Arc::new(Semaphore::new(cfg.batch.max_parallel.max(1)));
    let mut handles = Vec::with_capacity(files.len());

    for file in files {
        let permits = Arc::clone(&permits);
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let source = file.clone();
            let outcome = tokio::task::spawn_blocking(move || auto_parse(source)).await?;
            Ok::<_, anyhow::Error>(BatchEntry::from_outcome(&file, outcome))
        }));
    }

    // Join in argument order so output is stable regardless of finish order.
    let mut entries = Vec::with_capacity(handles.len());
    for handle in handles {
        entries.push(handle.await??);
    }
    let failures = entries.iter().filter(|e| e.error.is_some()).count();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json || cfg.output.format == OutputFormat::Json {
        serde_json::to_writer_pretty(&mut out, &entries).context("serialize batch")?;
        writeln!(out)?;
    } else {
        for entry in &entries {
            writeln!(out, "== {}", entry.file)?;
            match (&entry.record, &entry.error) {
                (Some(record), _) => render::write_table(&mut out, record, cfg.output.show_transactions)?,
                (None, Some(error)) => writeln!(out, "error: {error}")?,
                (None, None) => {}
            }
            writeln!(out)?;
        }
    }

    if failures > 0 {
        bail!("{failures} of {} statements could not be parsed", entries.len());
    }
    Ok(())
}
