use nutrisaur_types::events::CommunityEvent;

/// Dashboard panels that can be refreshed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    CommunityMetrics,
    WhoClassifications,
    TrendsChart,
    SevereCases,
    GeographicDistribution,
    BarangayDistribution,
    GenderDistribution,
    AgeClassification,
}

impl Panel {
    pub const ALL: [Panel; 8] = [
        Panel::CommunityMetrics,
        Panel::WhoClassifications,
        Panel::TrendsChart,
        Panel::SevereCases,
        Panel::GeographicDistribution,
        Panel::BarangayDistribution,
        Panel::GenderDistribution,
        Panel::AgeClassification,
    ];

    /// The trends chart always shows every barangay.
    pub fn is_scoped(self) -> bool {
        !matches!(self, Panel::TrendsChart)
    }
}

/// Panels to refresh for an event. Control events refresh nothing.
pub fn refreshes(event: &CommunityEvent) -> &'static [Panel] {
    use Panel::*;

    match event {
        CommunityEvent::ScreeningDataSaved { .. }
        | CommunityEvent::ScreeningDataUpdated { .. } => &[
            CommunityMetrics,
            WhoClassifications,
            TrendsChart,
            SevereCases,
            GeographicDistribution,
        ],
        CommunityEvent::NewUserRegistered { .. } => &[
            CommunityMetrics,
            GeographicDistribution,
            BarangayDistribution,
            GenderDistribution,
            TrendsChart,
        ],
        CommunityEvent::UserProfileUpdated { .. } => &[
            CommunityMetrics,
            GeographicDistribution,
            BarangayDistribution,
            GenderDistribution,
        ],
        CommunityEvent::BarangayDataChanged { .. } => {
            &[GeographicDistribution, BarangayDistribution, GenderDistribution]
        }
        CommunityEvent::DemographicDataChanged { .. } => {
            &[GenderDistribution, AgeClassification, CommunityMetrics]
        }
        CommunityEvent::PhysicalDataUpdated { .. } => {
            &[WhoClassifications, AgeClassification, SevereCases, TrendsChart]
        }
        CommunityEvent::WhoStandardChanged { .. } => &[
            WhoClassifications,
            AgeClassification,
            SevereCases,
            TrendsChart,
            CommunityMetrics,
        ],
        CommunityEvent::Connected { .. } | CommunityEvent::Heartbeat { .. } => &[],
    }
}
