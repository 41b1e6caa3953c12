use serde::{Deserialize, Serialize};

/// Risk score at or above which a screening counts as high risk.
pub const HIGH_RISK_THRESHOLD: i64 = 70;
/// Risk score at or above which a screening counts as moderate risk.
pub const MODERATE_RISK_THRESHOLD: i64 = 30;
/// Weight-for-height z-score below which a screening is severe acute malnutrition.
pub const SAM_WHZ_THRESHOLD: f64 = -3.0;
/// Mid-upper-arm circumference (cm) below which malnutrition risk is critical.
pub const CRITICAL_MUAC_CM: f64 = 11.5;
/// BMI below which a screening is flagged in critical alerts.
pub const LOW_BMI_THRESHOLD: f64 = 16.0;

/// Barangay query values with this prefix filter by municipality instead.
pub const MUNICIPALITY_PREFIX: &str = "MUNICIPALITY_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn classify(risk_score: i64) -> Self {
        if risk_score >= HIGH_RISK_THRESHOLD {
            Self::High
        } else if risk_score >= MODERATE_RISK_THRESHOLD {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

pub fn is_sam(whz_score: Option<f64>) -> bool {
    whz_score.is_some_and(|w| w < SAM_WHZ_THRESHOLD)
}

pub fn is_critical_muac(muac: Option<f64>) -> bool {
    muac.is_some_and(|m| m < CRITICAL_MUAC_CM)
}

pub fn is_low_bmi(bmi: Option<f64>) -> bool {
    bmi.is_some_and(|b| b < LOW_BMI_THRESHOLD)
}

/// Geographic scope of a dashboard query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocationFilter {
    #[default]
    All,
    /// Exact barangay match.
    Barangay(String),
    /// Any barangay whose name contains the municipality.
    Municipality(String),
}

impl LocationFilter {
    /// Parse the dashboard's `barangay` query parameter.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::All;
        }
        match raw.strip_prefix(MUNICIPALITY_PREFIX) {
            Some(municipality) => Self::Municipality(municipality.to_string()),
            None => Self::Barangay(raw.to_string()),
        }
    }

    pub fn matches(&self, barangay: &str) -> bool {
        match self {
            Self::All => true,
            Self::Barangay(b) => b == barangay,
            Self::Municipality(m) => barangay.contains(m.as_str()),
        }
    }
}
