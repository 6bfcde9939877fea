use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::grading::RiskGrade;
use super::policy::PolicyError;

/// Decision table row. Rows for a grade are tried in order; `max_rate` restricts a row to
/// quotes at or below that rate, and a row without one catches everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRule {
    pub grade: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rate: Option<f64>,
    pub decision: String,
    pub authority: String,
    pub conditions: String,
}

impl ApprovalRule {
    fn new(grade: u8, decision: &str, authority: &str, conditions: &str) -> Self {
        Self {
            grade,
            max_rate: None,
            decision: decision.to_string(),
            authority: authority.to_string(),
            conditions: conditions.to_string(),
        }
    }

    fn applies(&self, grade: u8, final_rate: f64) -> bool {
        self.grade == grade && self.max_rate.map_or(true, |max| final_rate <= max)
    }
}

pub fn default_approval_rules() -> Vec<ApprovalRule> {
    vec![
        ApprovalRule::new(1, "建議核准", "分行經理", "標準條件"),
        ApprovalRule::new(2, "建議核准", "分行經理", "標準條件"),
        ApprovalRule::new(3, "建議核准", "區域主管", "標準條件加強擔保"),
        ApprovalRule::new(4, "條件核准", "區域主管", "需額外擔保或保證人"),
        ApprovalRule::new(5, "條件核准", "總行審查", "強化擔保及密切追蹤"),
        ApprovalRule::new(6, "審慎評估", "總行審查", "特別簽報及風險控管"),
        ApprovalRule::new(7, "不建議核准", "總行審查", "除非有特殊理由及高階核准"),
        ApprovalRule::new(8, "拒絕", "N/A", "不符合授信政策"),
    ]
}

/// Recommendation handed back with an eligible quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalRecommendation {
    pub decision: String,
    pub authority: String,
    pub conditions: String,
}

impl From<&ApprovalRule> for ApprovalRecommendation {
    fn from(rule: &ApprovalRule) -> Self {
        Self {
            decision: rule.decision.clone(),
            authority: rule.authority.clone(),
            conditions: rule.conditions.clone(),
        }
    }
}

/// Routes priced applications to a decision and approving authority.
#[derive(Debug, Clone)]
pub struct ApprovalRouter {
    rules: Vec<ApprovalRule>,
    fallback: ApprovalRecommendation,
}

impl ApprovalRouter {
    /// Requires a catch-all row for every grade in `grades`.
    pub fn new(
        rules: Vec<ApprovalRule>,
        grades: impl IntoIterator<Item = u8>,
    ) -> Result<Self, PolicyError> {
        let catch_all: BTreeSet<u8> = rules
            .iter()
            .filter(|rule| rule.max_rate.is_none())
            .map(|rule| rule.grade)
            .collect();

        let mut worst = None;
        for grade in grades {
            if !catch_all.contains(&grade) {
                return Err(PolicyError::MissingApproval { grade });
            }
            worst = Some(grade);
        }
        let worst = worst.ok_or(PolicyError::EmptyGradeTable)?;

        if let Some(rule) = rules
            .iter()
            .find(|rule| rule.max_rate.is_some_and(|max| !max.is_finite()))
        {
            return Err(PolicyError::NonFinite(format!(
                "approval max_rate for grade {}",
                rule.grade
            )));
        }

        let fallback = rules
            .iter()
            .find(|rule| rule.grade == worst && rule.max_rate.is_none())
            .map(ApprovalRecommendation::from)
            .ok_or(PolicyError::MissingApproval { grade: worst })?;

        Ok(Self { rules, fallback })
    }

    pub fn route(&self, final_rate: f64, grade: &RiskGrade) -> ApprovalRecommendation {
        self.rules
            .iter()
            .find(|rule| rule.applies(grade.grade, final_rate))
            .map(ApprovalRecommendation::from)
            .unwrap_or_else(|| self.fallback.clone())
    }
}
