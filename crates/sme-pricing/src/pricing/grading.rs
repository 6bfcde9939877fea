use serde::{Deserialize, Serialize};

use super::policy::PolicyError;

/// One row of the grade table. A PD belongs to the first band whose `pd_upper_bound` it does
/// not exceed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub grade: u8,
    pub name: String,
    pub color: String,
    pub pd_upper_bound: f64,
    /// Typical market rate for borrowers of this grade.
    pub market_rate: f64,
}

impl GradeBand {
    fn new(grade: u8, name: &str, color: &str, pd_upper_bound: f64, market_rate: f64) -> Self {
        Self {
            grade,
            name: name.to_string(),
            color: color.to_string(),
            pd_upper_bound,
            market_rate,
        }
    }
}

pub fn default_grade_bands() -> Vec<GradeBand> {
    vec![
        GradeBand::new(1, "優良", "#28a745", 0.005, 0.028),
        GradeBand::new(2, "良好", "#5cb85c", 0.010, 0.035),
        GradeBand::new(3, "尚可", "#f0ad4e", 0.025, 0.045),
        GradeBand::new(4, "普通", "#ec971f", 0.050, 0.058),
        GradeBand::new(5, "注意", "#d58512", 0.100, 0.072),
        GradeBand::new(6, "次級", "#d9534f", 0.200, 0.090),
        GradeBand::new(7, "可疑", "#c9302c", 0.500, 0.110),
        GradeBand::new(8, "損失", "#ac2925", 1.000, 0.120),
    ]
}

/// Checks that bands are numbered 1..N, strictly increasing, and cover `[0, 1]`.
fn validate_bands(bands: &[GradeBand]) -> Result<(), PolicyError> {
    let last = bands.last().ok_or(PolicyError::EmptyGradeTable)?;

    let mut previous = 0.0;
    for (index, band) in bands.iter().enumerate() {
        let expected = index + 1;
        if usize::from(band.grade) != expected {
            return Err(PolicyError::GradeNumbering {
                expected,
                found: band.grade,
            });
        }
        if !band.pd_upper_bound.is_finite()
            || !band.market_rate.is_finite()
            || band.pd_upper_bound <= previous
        {
            return Err(PolicyError::GradeBreakpoints { grade: band.grade });
        }
        previous = band.pd_upper_bound;
    }

    if last.pd_upper_bound < 1.0 {
        return Err(PolicyError::GradeCoverage {
            upper_bound: last.pd_upper_bound,
        });
    }

    Ok(())
}

/// Grade assigned to a PD score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskGrade {
    pub grade: u8,
    pub name: String,
    pub color: String,
    pub market_rate: f64,
}

impl From<&GradeBand> for RiskGrade {
    fn from(band: &GradeBand) -> Self {
        Self {
            grade: band.grade,
            name: band.name.clone(),
            color: band.color.clone(),
            market_rate: band.market_rate,
        }
    }
}

/// Maps PD scores onto the configured grade table.
#[derive(Debug, Clone)]
pub struct RiskGrader {
    bands: Vec<GradeBand>,
    worst: RiskGrade,
}

impl RiskGrader {
    pub fn new(bands: Vec<GradeBand>) -> Result<Self, PolicyError> {
        validate_bands(&bands)?;
        let worst = bands
            .last()
            .map(RiskGrade::from)
            .ok_or(PolicyError::EmptyGradeTable)?;
        Ok(Self { bands, worst })
    }

    pub fn grade(&self, pd: f64) -> RiskGrade {
        self.bands
            .iter()
            .find(|band| pd <= band.pd_upper_bound)
            .map(RiskGrade::from)
            .unwrap_or_else(|| self.worst.clone())
    }

    pub fn grades(&self) -> impl Iterator<Item = u8> + '_ {
        self.bands.iter().map(|band| band.grade)
    }
}
