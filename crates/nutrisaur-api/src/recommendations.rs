use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use nutrisaur_db::models::ScreeningRow;
use nutrisaur_types::api::{
    CommunityProfile, FoodRecommendation, NutritionalPriority, RecommendationsResponse,
};
use nutrisaur_types::models::is_sam;

use crate::error::ApiError;
use crate::metrics::round_one_decimal;
use crate::state::{AppState, blocking};

const SCREENING_LIMIT: u32 = 50;

/// Risk score at which a screening counts towards the soup rule. Not the
/// dashboard's high-risk band (70).
const RECOMMENDATION_RISK_THRESHOLD: i64 = 50;
const CHILD_AGE_LIMIT: i64 = 18;
const ELDERLY_AGE: i64 = 65;
const LOW_DIETARY_DIVERSITY: i64 = 5;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    #[serde(default)]
    pub barangay: String,
    #[serde(default)]
    pub municipality: String,
}

struct Template {
    emoji: &'static str,
    name: &'static str,
    description: &'static str,
    priority: NutritionalPriority,
    impact: u8,
    ingredients: &'static str,
    benefits: &'static str,
}

impl Template {
    fn with_reasoning(&self, reasoning: impl Into<String>) -> FoodRecommendation {
        FoodRecommendation {
            food_emoji: self.emoji.to_string(),
            food_name: self.name.to_string(),
            food_description: self.description.to_string(),
            nutritional_priority: self.priority,
            nutritional_impact_score: self.impact,
            ingredients: self.ingredients.to_string(),
            benefits: self.benefits.to_string(),
            ai_reasoning: reasoning.into(),
        }
    }
}

const VEGETABLE_SOUP: Template = Template {
    emoji: "🥬",
    name: "High-Protein Vegetable Soup",
    description: "Nutrient-rich soup with leafy greens and lean protein for high-risk individuals",
    priority: NutritionalPriority::High,
    impact: 85,
    ingredients: "Spinach, kale, chicken breast, carrots, onions, garlic",
    benefits: "High protein, iron, vitamins A, C, K, and antioxidants",
};

const THERAPEUTIC_MILK: Template = Template {
    emoji: "🥛",
    name: "Therapeutic Milk Formula",
    description: "High-energy therapeutic milk for severe acute malnutrition cases (WHZ < -3)",
    priority: NutritionalPriority::Critical,
    impact: 95,
    ingredients: "Fortified milk powder, vegetable oil, sugar, vitamins, minerals",
    benefits: "High energy density, complete protein, essential vitamins and minerals",
};

const FRUIT_SMOOTHIE: Template = Template {
    emoji: "🍎",
    name: "Child-Friendly Fruit Smoothie",
    description: "Delicious smoothie packed with essential nutrients for growing children",
    priority: NutritionalPriority::Medium,
    impact: 75,
    ingredients: "Banana, apple, yogurt, honey, chia seeds, milk",
    benefits: "Calcium, protein, fiber, vitamins C and B6, natural sweetness",
};

const VEGETABLE_SALAD: Template = Template {
    emoji: "🥗",
    name: "Diverse Vegetable Salad",
    description: "Colorful salad with multiple vegetable types to improve dietary diversity",
    priority: NutritionalPriority::Medium,
    impact: 70,
    ingredients: "Mixed greens, tomatoes, cucumbers, bell peppers, carrots, avocado",
    benefits: "Multiple vitamins, minerals, fiber, and phytonutrients",
};

const WHOLE_GRAIN_PORRIDGE: Template = Template {
    emoji: "🌾",
    name: "Whole Grain Porridge",
    description: "Nutritious whole grain porridge for general community health improvement",
    priority: NutritionalPriority::Medium,
    impact: 65,
    ingredients: "Oats, quinoa, brown rice, nuts, dried fruits, honey",
    benefits: "Complex carbohydrates, fiber, protein, B vitamins, minerals",
};

const STARTER_PACK: Template = Template {
    emoji: "🥬",
    name: "Community Health Starter Pack",
    description: "Basic nutrition program to kickstart community health initiatives",
    priority: NutritionalPriority::Medium,
    impact: 70,
    ingredients: "Leafy greens, lean proteins, whole grains, fruits",
    benefits: "Balanced nutrition, essential vitamins, minerals, and fiber",
};

const EDUCATION_PROGRAM: Template = Template {
    emoji: "🥛",
    name: "Nutrition Education Program",
    description: "Educational initiative to improve community nutrition knowledge",
    priority: NutritionalPriority::High,
    impact: 80,
    ingredients: "Knowledge sharing, cooking demonstrations, health workshops",
    benefits: "Improved nutrition literacy, better food choices, long-term health outcomes",
};

pub async fn food_recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<RecommendationsResponse>, ApiError> {
    let barangay = Some(query.barangay.trim().to_string()).filter(|b| !b.is_empty());
    let municipality = Some(query.municipality.trim().to_string()).filter(|m| !m.is_empty());

    let rows = blocking(&state, move |s| {
        s.db.recommendation_screenings(
            barangay.as_deref(),
            municipality.as_deref(),
            SCREENING_LIMIT,
        )
    })
    .await?;

    if rows.is_empty() {
        return Ok(Json(RecommendationsResponse {
            success: true,
            data: fallback_recommendations(),
            total_users: 0,
            profile: None,
            message: "AI food recommendations generated successfully".to_string(),
        }));
    }

    let profile = community_profile(&rows);
    Ok(Json(RecommendationsResponse {
        success: true,
        data: recommend(&profile),
        total_users: rows.len(),
        profile: Some(profile),
        message: "AI food recommendations generated successfully".to_string(),
    }))
}

/// One pass over the screenings. Rows with a missing field never count
/// towards that field's rule.
pub fn community_profile(rows: &[ScreeningRow]) -> CommunityProfile {
    let mut profile = CommunityProfile::default();
    let mut risk_sum = 0i64;

    for row in rows {
        if row.risk_score >= RECOMMENDATION_RISK_THRESHOLD {
            profile.high_risk += 1;
        }
        if is_sam(row.whz_score) {
            profile.sam += 1;
        }
        match row.age {
            Some(age) if age > 0 && age < CHILD_AGE_LIMIT => profile.children += 1,
            Some(age) if age > ELDERLY_AGE => profile.elderly += 1,
            _ => {}
        }
        if row
            .dietary_diversity_score
            .is_some_and(|dds| dds > 0 && dds < LOW_DIETARY_DIVERSITY)
        {
            profile.low_dietary_diversity += 1;
        }
        risk_sum += row.risk_score;
    }

    if !rows.is_empty() {
        profile.avg_risk_score = round_one_decimal(risk_sum as f64 / rows.len() as f64);
    }
    profile
}

/// Targeted recommendations for every rule the profile satisfies, followed
/// by the general porridge recommendation.
pub fn recommend(profile: &CommunityProfile) -> Vec<FoodRecommendation> {
    let mut recommendations = Vec::new();

    if profile.high_risk > 0 {
        recommendations.push(VEGETABLE_SOUP.with_reasoning(format!(
            "Generated for {} high-risk individuals (risk score ≥50). This soup provides essential nutrients to support recovery and improve nutritional status.",
            profile.high_risk
        )));
    }
    if profile.sam > 0 {
        recommendations.push(THERAPEUTIC_MILK.with_reasoning(format!(
            "Critical intervention for {} SAM cases (WHZ < -3). Therapeutic milk provides concentrated nutrition for rapid recovery.",
            profile.sam
        )));
    }
    if profile.children > 0 {
        recommendations.push(FRUIT_SMOOTHIE.with_reasoning(format!(
            "Designed for {} children under 18. Smoothie format ensures easy consumption while providing essential nutrients for growth and development.",
            profile.children
        )));
    }
    if profile.low_dietary_diversity > 0 {
        recommendations.push(VEGETABLE_SALAD.with_reasoning(format!(
            "Addresses low dietary diversity in {} users. Variety ensures comprehensive nutrient intake and better health outcomes.",
            profile.low_dietary_diversity
        )));
    }

    recommendations.push(WHOLE_GRAIN_PORRIDGE.with_reasoning(format!(
        "General community health recommendation based on average risk score of {}. Whole grains provide sustained energy and essential nutrients.",
        profile.avg_risk_score
    )));
    recommendations
}

/// Static pair returned when no screenings match the filter.
pub fn fallback_recommendations() -> Vec<FoodRecommendation> {
    vec![
        STARTER_PACK.with_reasoning(
            "Sample recommendation for new communities. Register users to get personalized recommendations based on real health data.",
        ),
        EDUCATION_PROGRAM.with_reasoning(
            "Education is key to sustainable nutrition improvement. This program will help communities make informed food choices.",
        ),
    ]
}
