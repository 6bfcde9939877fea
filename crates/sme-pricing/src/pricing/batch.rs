use std::io::{Read, Write};

use serde::Serialize;
use tracing::{info, warn};

use super::domain::PredictionResult;
use super::service::PricingEngine;
use super::validation::LoanApplicationRequest;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to read or write batch file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid batch CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// One output row per input application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub row: usize,
    pub eligible: bool,
    pub final_rate_pct: Option<String>,
    pub risk_grade: Option<u8>,
    pub approval_decision: Option<String>,
    pub monthly_payment: Option<f64>,
    /// Failed eligibility rules or input problems, joined with `; `.
    pub issues: String,
}

impl BatchSummary {
    fn priced(row: usize, result: &PredictionResult) -> Self {
        let issues = result
            .failed_rules
            .iter()
            .map(|rule| rule.rule.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        match &result.pricing {
            Some(pricing) => Self {
                row,
                eligible: true,
                final_rate_pct: Some(pricing.final_rate_pct.clone()),
                risk_grade: Some(pricing.risk_grade),
                approval_decision: Some(pricing.approval_decision.clone()),
                monthly_payment: Some(pricing.monthly_payment),
                issues,
            },
            None => Self::rejected(row, issues),
        }
    }

    fn rejected(row: usize, issues: String) -> Self {
        Self {
            row,
            eligible: false,
            final_rate_pct: None,
            risk_grade: None,
            approval_decision: None,
            monthly_payment: None,
            issues,
        }
    }
}

/// Counts for a finished batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub rows: usize,
    pub eligible: usize,
    pub ineligible: usize,
    pub invalid: usize,
}

/// Prices every CSV row (same column names as the JSON request) and writes one summary row
/// per application. Malformed rows are reported in the output rather than aborting the run.
pub fn price_csv<R: Read, W: Write>(
    engine: &PricingEngine,
    reader: R,
    writer: W,
) -> Result<BatchReport, BatchError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut report = BatchReport::default();

    for (index, record) in csv_reader.deserialize::<LoanApplicationRequest>().enumerate() {
        let row = index + 1;
        report.rows += 1;

        let summary = match record {
            Ok(request) => match engine.quote(request) {
                Ok(result) => {
                    if result.is_eligible {
                        report.eligible += 1;
                    } else {
                        report.ineligible += 1;
                    }
                    BatchSummary::priced(row, &result)
                }
                Err(error) => {
                    report.invalid += 1;
                    let issues = error
                        .errors
                        .iter()
                        .map(|field| format!("{}: {}", field.field, field.message))
                        .collect::<Vec<_>>()
                        .join("; ");
                    BatchSummary::rejected(row, issues)
                }
            },
            Err(error) if error.is_io_error() => return Err(error.into()),
            Err(error) => {
                warn!(row, error = %error, "skipping unreadable batch row");
                report.invalid += 1;
                BatchSummary::rejected(row, error.to_string())
            }
        };

        csv_writer.serialize(summary)?;
    }

    csv_writer.flush()?;
    info!(
        rows = report.rows,
        eligible = report.eligible,
        ineligible = report.ineligible,
        invalid = report.invalid,
        "batch pricing finished"
    );
    Ok(report)
}
