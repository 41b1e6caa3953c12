use serde::{Deserialize, Serialize};

use crate::models::LocationFilter;

/// Events pushed to dashboards over the community event stream.
///
/// Serialized as `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CommunityEvent {
    /// A new screening was submitted
    ScreeningDataSaved {
        #[serde(default)]
        barangay: String,
        #[serde(default)]
        screening_id: Option<i64>,
    },

    /// An existing screening was edited
    ScreeningDataUpdated {
        #[serde(default)]
        barangay: String,
        #[serde(default)]
        screening_id: Option<i64>,
    },

    NewUserRegistered {
        #[serde(default)]
        barangay: String,
        #[serde(default)]
        username: String,
    },

    UserProfileUpdated {
        #[serde(default)]
        barangay: String,
    },

    BarangayDataChanged {
        #[serde(default)]
        barangay: String,
    },

    DemographicDataChanged {
        #[serde(default)]
        barangay: String,
    },

    /// Weight/height measurements changed
    PhysicalDataUpdated {
        #[serde(default)]
        barangay: String,
    },

    /// The dashboard switched WHO growth standard
    WhoStandardChanged {
        #[serde(default)]
        barangay: String,
        who_standard: String,
    },

    /// Stream opened
    Connected {
        #[serde(default)]
        barangay: String,
        timestamp: i64,
    },

    Heartbeat { timestamp: i64 },
}

impl CommunityEvent {
    /// Every wire name, in declaration order.
    pub const KINDS: [&'static str; 10] = [
        "screening_data_saved",
        "screening_data_updated",
        "new_user_registered",
        "user_profile_updated",
        "barangay_data_changed",
        "demographic_data_changed",
        "physical_data_updated",
        "who_standard_changed",
        "connected",
        "heartbeat",
    ];

    /// Wire name of the event type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScreeningDataSaved { .. } => "screening_data_saved",
            Self::ScreeningDataUpdated { .. } => "screening_data_updated",
            Self::NewUserRegistered { .. } => "new_user_registered",
            Self::UserProfileUpdated { .. } => "user_profile_updated",
            Self::BarangayDataChanged { .. } => "barangay_data_changed",
            Self::DemographicDataChanged { .. } => "demographic_data_changed",
            Self::PhysicalDataUpdated { .. } => "physical_data_updated",
            Self::WhoStandardChanged { .. } => "who_standard_changed",
            Self::Connected { .. } => "connected",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }

    /// Returns the barangay this event is scoped to.
    /// Events that return `None` are global and reach every stream.
    pub fn barangay(&self) -> Option<&str> {
        let barangay = match self {
            Self::ScreeningDataSaved { barangay, .. }
            | Self::ScreeningDataUpdated { barangay, .. }
            | Self::NewUserRegistered { barangay, .. }
            | Self::UserProfileUpdated { barangay }
            | Self::BarangayDataChanged { barangay }
            | Self::DemographicDataChanged { barangay }
            | Self::PhysicalDataUpdated { barangay }
            | Self::WhoStandardChanged { barangay, .. }
            | Self::Connected { barangay, .. } => barangay.as_str(),
            Self::Heartbeat { .. } => "",
        };
        (!barangay.is_empty()).then_some(barangay)
    }

    /// Whether a stream opened with `filter` should receive this event.
    pub fn is_visible_to(&self, filter: &LocationFilter) -> bool {
        match self.barangay() {
            Some(barangay) => filter.matches(barangay),
            None => true,
        }
    }

    /// Connection-level events carry no dashboard data.
    pub fn is_control(&self) -> bool {
        matches!(self, Self::Connected { .. } | Self::Heartbeat { .. })
    }
}
