use crate::infra::build_engine;
use clap::Args;
use sme_pricing::config::AppConfig;
use sme_pricing::error::AppError;
use sme_pricing::telemetry::{self, LogSink};
use sme_pricing::pricing::{LoanApplicationRequest, PredictionResult, PricingEngine};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// JSON file holding one loan application
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Pretty-print the result
    #[arg(long)]
    pub(crate) pretty: bool,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogSink::Stderr)?;
    let engine = build_engine(&config.engine)?;

    let reader = BufReader::new(File::open(&args.input)?);
    let request: LoanApplicationRequest = serde_json::from_reader(reader)?;
    let result = quote(&engine, request)?;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{rendered}");
    Ok(())
}

fn quote(
    engine: &PricingEngine,
    request: LoanApplicationRequest,
) -> Result<PredictionResult, AppError> {
    Ok(engine.quote(request)?)
}
