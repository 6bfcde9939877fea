use crate::infra::build_engine;
use clap::Args;
use sme_pricing::config::AppConfig;
use sme_pricing::error::AppError;
use sme_pricing::telemetry::{self, LogSink};
use sme_pricing::pricing::price_csv;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV file with one application per row, using the JSON field names as headers
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Where to write the summary CSV (defaults to stdout)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogSink::Stderr)?;
    let engine = build_engine(&config.engine)?;

    let reader = BufReader::new(File::open(&args.input)?);
    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    let report = price_csv(&engine, reader, writer)?;
    eprintln!(
        "priced {} applications: {} eligible, {} ineligible, {} invalid",
        report.rows, report.eligible, report.ineligible, report.invalid
    );
    Ok(())
}
