//! Feedback topics
//!
//! The classifier picks from a closed set of four topics. `Uncategorized`
//! is the fallback when classification fails. Any other label the model
//! returns is kept verbatim as `Unrecognized`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    UiUxExperience,
    FeatureRequest,
    PricingBilling,
    PerformanceIssue,
    Uncategorized,
    Unrecognized(String),
}

impl Topic {
    /// Topics offered to the classifier, in prompt order
    pub const CLASSIFIABLE: [Topic; 4] = [
        Topic::UiUxExperience,
        Topic::FeatureRequest,
        Topic::PricingBilling,
        Topic::PerformanceIssue,
    ];

    pub fn label(&self) -> &str {
        match self {
            Topic::UiUxExperience => "UI/UX Experience",
            Topic::FeatureRequest => "Feature Request",
            Topic::PricingBilling => "Pricing/Billing",
            Topic::PerformanceIssue => "Performance Issue",
            Topic::Uncategorized => "Uncategorized",
            Topic::Unrecognized(label) => label,
        }
    }

    /// Interpret raw model output
    ///
    /// Strips whitespace, wrapping quotes/backticks/asterisks and a trailing
    /// period, then matches known labels case-insensitively. Returns `None`
    /// when nothing is left.
    pub fn from_response(raw: &str) -> Option<Topic> {
        let cleaned = raw
            .trim()
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*'))
            .trim()
            .trim_end_matches('.')
            .trim();

        if cleaned.is_empty() {
            return None;
        }

        let known = Topic::CLASSIFIABLE
            .iter()
            .chain(std::iter::once(&Topic::Uncategorized))
            .find(|topic| topic.label().eq_ignore_ascii_case(cleaned))
            .cloned();

        Some(known.unwrap_or_else(|| Topic::Unrecognized(cleaned.to_string())))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
