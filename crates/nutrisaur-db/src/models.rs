/// Database row types. These map directly to SQLite rows.
/// Distinct from nutrisaur-types API models to keep the DB layer independent.

pub struct UserRow {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct AdminRow {
    pub admin_id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

/// Single-row result of the community metrics aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRow {
    pub total_screenings: i64,
    pub avg_risk_score: Option<f64>,
    pub high_risk: i64,
    pub moderate_risk: i64,
    pub low_risk: i64,
    pub sam_cases: i64,
    pub critical_muac: i64,
    pub barangays_covered: i64,
    pub screenings_this_week: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ScreeningRow {
    pub id: i64,
    pub name: Option<String>,
    pub user_email: Option<String>,
    pub age: Option<i64>,
    pub barangay: Option<String>,
    pub risk_score: i64,
    pub bmi: Option<f64>,
    pub muac: Option<f64>,
    pub whz_score: Option<f64>,
    pub dietary_diversity_score: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewScreening {
    pub user_email: Option<String>,
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub barangay: String,
    pub municipality: Option<String>,
    pub bmi: Option<f64>,
    pub muac: Option<f64>,
    pub whz_score: Option<f64>,
    pub risk_score: i64,
    pub dietary_diversity_score: Option<i64>,
    pub swelling: Option<String>,
    pub weight_loss: Option<String>,
    pub feeding_behavior: Option<String>,
}

pub struct NotificationLogRow {
    pub id: i64,
    pub event_id: Option<i64>,
    pub notification_type: String,
    pub target_type: String,
    pub target_value: Option<String>,
    pub tokens_sent: i64,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewNotificationLog {
    pub event_id: Option<i64>,
    pub notification_type: String,
    pub target_type: String,
    pub target_value: Option<String>,
    pub tokens_sent: i64,
    pub success: bool,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationStatsRow {
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
    pub by_type: Vec<(String, i64)>,
    pub by_target: Vec<(String, i64)>,
    pub total_tokens_sent: i64,
    pub last_24h: i64,
}

/// Result of a registration attempt.
pub enum RegisterOutcome<T> {
    /// User inserted and committed; `session` is what the caller issued
    /// inside the transaction.
    Created { user_id: i64, session: T },
    /// Username or e-mail already taken. Nothing was written.
    Duplicate,
}
