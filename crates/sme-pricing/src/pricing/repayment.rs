use serde::Serialize;

/// Level-payment repayment figures for a fixed-rate, fixed-term loan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RepaymentSchedule {
    pub monthly_payment: f64,
    pub total_payment: f64,
    pub total_interest: f64,
}

/// Standard amortization. `annual_rate` is a fraction (0.045 = 4.5%).
pub fn amortize(principal: f64, annual_rate: f64, tenor_months: u16) -> RepaymentSchedule {
    let periods = tenor_months.max(1);
    let n = f64::from(periods);
    let monthly_rate = annual_rate / 12.0;

    let monthly_payment = if monthly_rate == 0.0 {
        principal / n
    } else {
        // (1+r)^n and (1+r)^n - 1 via ln_1p/exp_m1 keep precision for small rates
        let log_growth = n * monthly_rate.ln_1p();
        principal * monthly_rate * log_growth.exp() / log_growth.exp_m1()
    };

    let total_payment = monthly_payment * n;
    RepaymentSchedule {
        monthly_payment,
        total_payment,
        total_interest: total_payment - principal,
    }
}
