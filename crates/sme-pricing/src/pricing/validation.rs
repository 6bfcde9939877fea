use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{LoanApplication, Sector, SUPPORTED_TENORS};

/// Wire shape of a quote request. Fields are kept as raw JSON values so that absence and
/// type mismatches are reported per field instead of failing the whole body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanApplicationRequest {
    pub annual_revenue_ntd: Option<Value>,
    pub years_in_business: Option<Value>,
    pub num_employees: Option<Value>,
    pub business_sector: Option<Value>,
    pub credit_score: Option<Value>,
    pub loan_amount_ntd: Option<Value>,
    pub tenor_months: Option<Value>,
    pub collateral_value_ntd: Option<Value>,
    #[serde(default)]
    pub is_existing_customer: Option<Value>,
    #[serde(default)]
    pub has_credit_guarantee: Option<Value>,
}

impl From<&LoanApplication> for LoanApplicationRequest {
    fn from(application: &LoanApplication) -> Self {
        Self {
            annual_revenue_ntd: Some(Value::from(application.annual_revenue_ntd)),
            years_in_business: Some(Value::from(application.years_in_business)),
            num_employees: Some(Value::from(application.num_employees)),
            business_sector: Some(Value::from(application.business_sector.as_str())),
            credit_score: Some(Value::from(application.credit_score)),
            loan_amount_ntd: Some(Value::from(application.loan_amount_ntd)),
            tenor_months: Some(Value::from(application.tenor_months)),
            collateral_value_ntd: Some(Value::from(application.collateral_value_ntd)),
            is_existing_customer: Some(Value::from(application.is_existing_customer)),
            has_credit_guarantee: Some(Value::from(application.has_credit_guarantee)),
        }
    }
}

/// Accepted input ranges. Values outside them are malformed, not ineligible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputLimits {
    pub max_years_in_business: u32,
    pub max_employees: u32,
    pub min_credit_score: u16,
    pub max_credit_score: u16,
    pub max_loan_amount_ntd: f64,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_years_in_business: 100,
            max_employees: 10_000,
            min_credit_score: 300,
            max_credit_score: 850,
            max_loan_amount_ntd: 100_000_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every field-level problem found in a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details: Vec<String> = self
            .errors
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect();
        write!(f, "invalid loan application ({})", details.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Turns wire requests into validated applications.
#[derive(Debug, Clone, Default)]
pub struct IntakeValidator {
    limits: InputLimits,
}

impl IntakeValidator {
    pub fn new(limits: InputLimits) -> Self {
        Self { limits }
    }

    pub fn validate(
        &self,
        request: &LoanApplicationRequest,
    ) -> Result<LoanApplication, ValidationError> {
        let limits = &self.limits;
        let mut errors = Vec::new();

        let annual_revenue_ntd = amount(
            &mut errors,
            "annual_revenue_ntd",
            request.annual_revenue_ntd.as_ref(),
            None,
        );
        let years_in_business = integer(
            &mut errors,
            "years_in_business",
            request.years_in_business.as_ref(),
            1,
            i64::from(limits.max_years_in_business),
        )
        .and_then(|value| u32::try_from(value).ok());
        let num_employees = integer(
            &mut errors,
            "num_employees",
            request.num_employees.as_ref(),
            1,
            i64::from(limits.max_employees),
        )
        .and_then(|value| u32::try_from(value).ok());
        let business_sector = sector(&mut errors, request.business_sector.as_ref());
        let credit_score = integer(
            &mut errors,
            "credit_score",
            request.credit_score.as_ref(),
            i64::from(limits.min_credit_score),
            i64::from(limits.max_credit_score),
        )
        .and_then(|value| u16::try_from(value).ok());
        let loan_amount_ntd = amount(
            &mut errors,
            "loan_amount_ntd",
            request.loan_amount_ntd.as_ref(),
            Some(limits.max_loan_amount_ntd),
        );
        let tenor_months = tenor(&mut errors, request.tenor_months.as_ref());
        let collateral_value_ntd = amount(
            &mut errors,
            "collateral_value_ntd",
            request.collateral_value_ntd.as_ref(),
            None,
        );
        let is_existing_customer = flag(
            &mut errors,
            "is_existing_customer",
            request.is_existing_customer.as_ref(),
        );
        let has_credit_guarantee = flag(
            &mut errors,
            "has_credit_guarantee",
            request.has_credit_guarantee.as_ref(),
        );

        match (
            annual_revenue_ntd,
            years_in_business,
            num_employees,
            business_sector,
            credit_score,
            loan_amount_ntd,
            tenor_months,
            collateral_value_ntd,
        ) {
            (
                Some(annual_revenue_ntd),
                Some(years_in_business),
                Some(num_employees),
                Some(business_sector),
                Some(credit_score),
                Some(loan_amount_ntd),
                Some(tenor_months),
                Some(collateral_value_ntd),
            ) if errors.is_empty() => Ok(LoanApplication {
                annual_revenue_ntd,
                years_in_business,
                num_employees,
                business_sector,
                credit_score,
                loan_amount_ntd,
                tenor_months,
                collateral_value_ntd,
                is_existing_customer,
                has_credit_guarantee,
            }),
            _ => Err(ValidationError { errors }),
        }
    }
}

fn missing(errors: &mut Vec<FieldError>, field: &'static str) {
    errors.push(FieldError {
        field,
        message: "field is required".to_string(),
    });
}

/// Present, non-null value or a "field is required" error.
fn present<'a>(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: Option<&'a Value>,
) -> Option<&'a Value> {
    match value {
        None | Some(Value::Null) => {
            missing(errors, field);
            None
        }
        Some(value) => Some(value),
    }
}

/// Accepts JSON numbers and numeric strings (CSV cells, form posts).
fn number(errors: &mut Vec<FieldError>, field: &'static str, value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        errors.push(FieldError {
            field,
            message: format!("must be a number, got {value}"),
        });
    }
    parsed
}

fn amount(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: Option<&Value>,
    max: Option<f64>,
) -> Option<f64> {
    let value = present(errors, field, value)?;
    let value = number(errors, field, value)?;

    if !value.is_finite() || value < 0.0 {
        errors.push(FieldError {
            field,
            message: format!("must be a non-negative amount, got {value}"),
        });
        return None;
    }

    if let Some(max) = max {
        if value > max {
            errors.push(FieldError {
                field,
                message: format!("must not exceed {max:.0}, got {value:.0}"),
            });
            return None;
        }
    }

    Some(value)
}

/// Whole numbers only; `10.0` is accepted as `10`.
fn whole(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: Option<&Value>,
) -> Option<i64> {
    let value = present(errors, field, value)?;
    if let Some(exact) = value.as_i64() {
        return Some(exact);
    }

    let value = number(errors, field, value)?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= i64::MAX as f64 {
        Some(value as i64)
    } else {
        errors.push(FieldError {
            field,
            message: format!("must be a whole number, got {value}"),
        });
        None
    }
}

fn integer(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: Option<&Value>,
    min: i64,
    max: i64,
) -> Option<i64> {
    let value = whole(errors, field, value)?;

    if !(min..=max).contains(&value) {
        errors.push(FieldError {
            field,
            message: format!("must be between {min} and {max}, got {value}"),
        });
        return None;
    }

    Some(value)
}

fn sector(errors: &mut Vec<FieldError>, value: Option<&Value>) -> Option<Sector> {
    let value = present(errors, "business_sector", value)?;
    let Value::String(raw) = value else {
        errors.push(FieldError {
            field: "business_sector",
            message: format!("must be a string, got {value}"),
        });
        return None;
    };

    let parsed = Sector::parse(raw);
    if parsed.is_none() {
        let allowed: Vec<&str> = Sector::ALL.iter().map(|sector| sector.as_str()).collect();
        errors.push(FieldError {
            field: "business_sector",
            message: format!("must be one of {}, got '{raw}'", allowed.join(", ")),
        });
    }
    parsed
}

fn tenor(errors: &mut Vec<FieldError>, value: Option<&Value>) -> Option<u16> {
    let value = whole(errors, "tenor_months", value)?;

    let tenor = u16::try_from(value)
        .ok()
        .filter(|months| SUPPORTED_TENORS.contains(months));
    if tenor.is_none() {
        let allowed: Vec<String> = SUPPORTED_TENORS.iter().map(u16::to_string).collect();
        errors.push(FieldError {
            field: "tenor_months",
            message: format!("must be one of {}, got {value}", allowed.join(", ")),
        });
    }
    tenor
}

/// Optional yes/no flag; absent or null means `false`.
fn flag(errors: &mut Vec<FieldError>, field: &'static str, value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(raw)) if raw.trim().eq_ignore_ascii_case("true") => true,
        Some(Value::String(raw)) if raw.trim().eq_ignore_ascii_case("false") => false,
        Some(other) => {
            errors.push(FieldError {
                field,
                message: format!("must be true or false, got {other}"),
            });
            false
        }
    }
}
