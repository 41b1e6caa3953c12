use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::RiskLevel;

// -- Session --

/// Session claims carried in the signed session cookie. Shared by the API
/// (issuing and middleware) and the dashboard client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Session identifier, freshly generated on every login.
    pub sid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<i64>,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: usize,
}

// -- Envelope --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn ok_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

// -- Auth --

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    /// Username or e-mail address.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<i64>,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterData {
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

// -- Community metrics --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityMetrics {
    pub total_screenings: i64,
    pub avg_risk_score: f64,
    pub risk_distribution: RiskDistribution,
    pub sam_cases: i64,
    pub critical_muac: i64,
    pub barangays_covered: i64,
    pub recent_activity: RecentActivity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub high: i64,
    pub moderate: i64,
    pub low: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentActivity {
    pub screenings_this_week: i64,
}

// -- Critical alerts --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalAlert {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub user: String,
    pub user_email: Option<String>,
    pub time: String,
    pub risk_score: i64,
    pub bmi: Option<f64>,
    pub muac: Option<f64>,
    pub whz_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalAlertsResponse {
    pub success: bool,
    pub data: Vec<CriticalAlert>,
    pub total_critical_cases: usize,
    pub barangay_filter: String,
}

// -- Food recommendations --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NutritionalPriority {
    Critical,
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecommendation {
    pub food_emoji: String,
    pub food_name: String,
    pub food_description: String,
    pub nutritional_priority: NutritionalPriority,
    pub nutritional_impact_score: u8,
    pub ingredients: String,
    pub benefits: String,
    pub ai_reasoning: String,
}

/// Aggregate counts the recommendation rules are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityProfile {
    pub high_risk: usize,
    pub sam: usize,
    pub children: usize,
    pub elderly: usize,
    pub low_dietary_diversity: usize,
    pub avg_risk_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub success: bool,
    pub data: Vec<FoodRecommendation>,
    pub total_users: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<CommunityProfile>,
    pub message: String,
}

// -- Notification logs --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLog {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationLogsResponse {
    pub success: bool,
    pub logs: Vec<NotificationLog>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordNotificationRequest {
    #[serde(default)]
    pub event_id: Option<i64>,
    pub notification_type: String,
    pub target_type: String,
    #[serde(default)]
    pub target_value: Option<String>,
    #[serde(default)]
    pub tokens_sent: i64,
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountBy {
    pub key: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total_notifications: i64,
    pub successful_notifications: i64,
    pub failed_notifications: i64,
    pub success_rate: f64,
    pub by_type: Vec<CountBy>,
    pub by_target: Vec<CountBy>,
    pub total_tokens_sent: i64,
    pub notifications_24h: i64,
}

// -- Screenings --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitScreeningRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub gender: Option<String>,
    pub barangay: String,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub bmi: Option<f64>,
    #[serde(default)]
    pub muac: Option<f64>,
    #[serde(default)]
    pub whz_score: Option<f64>,
    pub risk_score: i64,
    #[serde(default)]
    pub dietary_diversity_score: Option<i64>,
    #[serde(default)]
    pub swelling: Option<String>,
    #[serde(default)]
    pub weight_loss: Option<String>,
    #[serde(default)]
    pub feeding_behavior: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningSaved {
    pub id: i64,
    pub risk_level: RiskLevel,
}
