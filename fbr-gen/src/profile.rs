//! Synthetic customer profile shape

use fbr_common::records::UNASSIGNED;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanySize {
    #[serde(rename = "1-10")]
    Micro,
    #[serde(rename = "11-50")]
    Small,
    #[serde(rename = "51-200")]
    Medium,
    #[serde(rename = "201-1000")]
    Large,
    #[serde(rename = "1000+")]
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductTier {
    Free,
    Pro,
    Enterprise,
}

/// One customer record as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub contact_name: String,
    pub contact_email: String,
    pub company_name: String,
    pub company_size: CompanySize,
    pub industry: String,
    pub product_tier: ProductTier,
    pub monthly_spend_usd: f64,
    /// -1.0 (negative) to 1.0 (positive)
    pub user_sentiment_score: f64,
    pub last_feedback_summary: String,
    #[serde(default = "unassigned")]
    pub assigned_interviewer_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Fields outside the known shape, stored as generated
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unassigned() -> String {
    UNASSIGNED.to_string()
}

impl UserProfile {
    /// Prepare a generated profile for upload under `user_id`
    ///
    /// Forces the assignment back to unassigned and clamps numeric fields the
    /// model may have drifted on.
    pub fn into_record(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self.assigned_interviewer_agent = UNASSIGNED.to_string();
        self.user_sentiment_score = self.user_sentiment_score.clamp(-1.0, 1.0);
        self.monthly_spend_usd = self.monthly_spend_usd.max(0.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "contact_name": "Priya Natarajan",
            "contact_email": "priya@northwind.io",
            "company_name": "Northwind",
            "company_size": "51-200",
            "industry": "Logistics",
            "product_tier": "Pro",
            "monthly_spend_usd": 499.0,
            "user_sentiment_score": -0.4,
            "last_feedback_summary": "Route exports time out on large fleets.",
            "assigned_interviewer_agent": "N/A"
        })
    }

    #[test]
    fn test_deserialize_profile() {
        let profile: UserProfile = serde_json::from_value(sample()).unwrap();
        assert_eq!(profile.company_size, CompanySize::Medium);
        assert_eq!(profile.product_tier, ProductTier::Pro);
        assert_eq!(profile.user_id, None);
    }

    #[test]
    fn test_company_size_labels() {
        let sizes = [
            (CompanySize::Micro, "1-10"),
            (CompanySize::Small, "11-50"),
            (CompanySize::Medium, "51-200"),
            (CompanySize::Large, "201-1000"),
            (CompanySize::Enterprise, "1000+"),
        ];
        for (size, label) in sizes {
            assert_eq!(serde_json::to_value(size).unwrap(), json!(label));
        }
    }

    #[test]
    fn test_unknown_tier_rejected() {
        let mut value = sample();
        value["product_tier"] = json!("Platinum");
        assert!(serde_json::from_value::<UserProfile>(value).is_err());
    }

    #[test]
    fn test_missing_assignment_defaults_to_unassigned() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("assigned_interviewer_agent");
        let profile: UserProfile = serde_json::from_value(value).unwrap();
        assert_eq!(profile.assigned_interviewer_agent, "N/A");
    }

    #[test]
    fn test_into_record() {
        let mut profile: UserProfile = serde_json::from_value(sample()).unwrap();
        profile.assigned_interviewer_agent = "UX Research Team".to_string();
        profile.user_sentiment_score = 3.5;
        profile.monthly_spend_usd = -10.0;

        let record = profile.into_record("abc");
        assert_eq!(record.user_id.as_deref(), Some("abc"));
        assert_eq!(record.assigned_interviewer_agent, "N/A");
        assert_eq!(record.user_sentiment_score, 1.0);
        assert_eq!(record.monthly_spend_usd, 0.0);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["user_id"], json!("abc"));
    }

    #[test]
    fn test_extra_fields_survive_round_trip() {
        let mut value = sample();
        value["account_manager"] = json!("Rosa");
        let profile: UserProfile = serde_json::from_value(value).unwrap();
        assert_eq!(profile.extra.len(), 1);

        let stored = serde_json::to_value(profile.into_record("abc")).unwrap();
        assert_eq!(stored["account_manager"], json!("Rosa"));
        assert_eq!(stored["company_size"], json!("51-200"));
    }
}
