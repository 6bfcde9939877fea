use super::super::domain::LoanApplication;
use super::config::EligibilityConfig;
use super::{EligibilityRule, FailedRule};

/// Applies every configured rule in a fixed order and reports each violation.
pub(crate) fn failed_rules(
    application: &LoanApplication,
    config: &EligibilityConfig,
) -> Vec<FailedRule> {
    let ratios = application.ratios();
    let mut failed = Vec::new();

    if let Some(minimum) = config.minimum_annual_revenue_ntd {
        if application.annual_revenue_ntd < minimum {
            failed.push(FailedRule {
                code: EligibilityRule::MinimumAnnualRevenue,
                rule: format!("最低年營收 NT${}", group_thousands(minimum)),
                actual: format!("NT$ {}", group_thousands(application.annual_revenue_ntd)),
                required: format!("NT$ {}", group_thousands(minimum)),
            });
        }
    }

    if let Some(minimum) = config.minimum_credit_score {
        if application.credit_score < minimum {
            failed.push(FailedRule {
                code: EligibilityRule::MinimumCreditScore,
                rule: format!("最低信用分數 {minimum}"),
                actual: application.credit_score.to_string(),
                required: minimum.to_string(),
            });
        }
    }

    if let Some(minimum) = config.minimum_years_in_business {
        if application.years_in_business < minimum {
            failed.push(FailedRule {
                code: EligibilityRule::MinimumYearsInBusiness,
                rule: format!("最低營業年數 {minimum}年"),
                actual: format!("{} 年", application.years_in_business),
                required: format!("{minimum} 年"),
            });
        }
    }

    if let Some(maximum) = config.maximum_debt_to_revenue {
        if ratios.debt_to_revenue > maximum {
            failed.push(FailedRule {
                code: EligibilityRule::MaximumDebtToRevenue,
                rule: format!("DBR不得超過{:.0}%", maximum * 100.0),
                actual: format!("{:.1}%", ratios.debt_to_revenue * 100.0),
                required: format!("{:.0}%", maximum * 100.0),
            });
        }
    }

    if let Some(minimum) = config.minimum_collateral_coverage {
        if ratios.collateral_coverage < minimum {
            failed.push(FailedRule {
                code: EligibilityRule::MinimumCollateralCoverage,
                rule: format!("擔保覆蓋率不得低於{:.0}%", minimum * 100.0),
                actual: format!("{:.1}%", ratios.collateral_coverage * 100.0),
                required: format!("{:.0}%", minimum * 100.0),
            });
        }
    }

    if let Some(maximum) = config.maximum_loan_amount_ntd {
        if application.loan_amount_ntd > maximum {
            failed.push(FailedRule {
                code: EligibilityRule::MaximumLoanAmount,
                rule: format!("貸款金額不得超過 NT${}", group_thousands(maximum)),
                actual: format!("NT$ {}", group_thousands(application.loan_amount_ntd)),
                required: format!("NT$ {}", group_thousands(maximum)),
            });
        }
    }

    failed
}

/// Formats a currency amount rounded to whole units with comma separators.
pub(crate) fn group_thousands(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
