//! Risk-based pricing engine for SME loan applications.
//!
//! The engine screens an application against hard eligibility rules, estimates a probability
//! of default, grades the risk, composes the quoted rate from named components, routes the
//! approval, and amortizes the loan.

pub mod config;
pub mod error;
pub mod pricing;
pub mod telemetry;
