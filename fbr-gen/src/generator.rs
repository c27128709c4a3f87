//! Batch profile generation and upload
//!
//! Profiles are requested in batches. A batch that cannot be generated or
//! parsed is retried after a random delay and skipped once `max_retries`
//! attempts have failed. Generation finishes before any upload starts.

use crate::profile::UserProfile;
use fbr_common::config::GeneratorSettings;
use fbr_common::genai::{GenerationError, TextGenerator};
use fbr_common::RecordStore;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Why a batch attempt produced no profiles
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Unparseable profile batch: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Response contained no usable profiles")]
    Empty,
}

/// Totals for one generator run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub batches_attempted: usize,
    pub batches_failed: usize,
    pub profiles_generated: usize,
    pub profiles_uploaded: usize,
}

/// Prompt asking for `count` profiles as a bare JSON array
pub fn build_prompt(count: usize) -> String {
    format!(
        r#"Generate {count} unique and diverse synthetic user profiles for a B2B software company.
The output should be a single, valid JSON array where each object is a user profile.

CRITICAL INSTRUCTIONS:
- The 'last_feedback_summary' should be a realistic user complaint, question, or feedback.
- Set 'assigned_interviewer_agent' to "N/A" for all generated users.

Here is the required JSON structure. Do not output anything other than the JSON array.

[
  {{
    "contact_name": "string",
    "contact_email": "string (valid email format)",
    "company_name": "string",
    "company_size": "string (one of '1-10', '11-50', '51-200', '201-1000', '1000+')",
    "industry": "string",
    "product_tier": "string (one of 'Free', 'Pro', 'Enterprise')",
    "monthly_spend_usd": float,
    "user_sentiment_score": float (from -1.0 to 1.0),
    "last_feedback_summary": "string (1-2 sentences of plausible user feedback)",
    "assigned_interviewer_agent": "N/A"
  }}
]"#
    )
}

/// Parse a model response, tolerating markdown code fences
///
/// The response must be a JSON array. Items that do not form a valid
/// profile are logged and dropped; the batch fails only when none is left.
pub fn parse_profiles(response: &str) -> Result<Vec<UserProfile>, BatchError> {
    let cleaned = response.replace("```json", "").replace("```", "");
    let items: Vec<Value> = serde_json::from_str(cleaned.trim())?;

    let mut profiles = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<UserProfile>(item) {
            Ok(profile) => profiles.push(profile),
            Err(e) => warn!(index, error = %e, "Skipping malformed profile"),
        }
    }

    if profiles.is_empty() {
        return Err(BatchError::Empty);
    }
    Ok(profiles)
}

pub struct ProfileGenerator {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn RecordStore>,
    settings: GeneratorSettings,
}

impl ProfileGenerator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn RecordStore>,
        settings: GeneratorSettings,
    ) -> Self {
        Self {
            generator,
            store,
            settings,
        }
    }

    /// Generate every batch, then upload what was produced
    pub async fn run(&self) -> GenerationReport {
        let mut report = GenerationReport::default();
        let total_batches = self.settings.batch_count();
        let mut profiles = Vec::with_capacity(self.settings.num_records);

        info!(
            num_records = self.settings.num_records,
            batches = total_batches,
            "Generating synthetic profiles"
        );

        for batch in 1..=total_batches {
            let already_requested = (batch - 1) * self.settings.batch_size;
            let wanted = self
                .settings
                .batch_size
                .min(self.settings.num_records - already_requested);
            report.batches_attempted += 1;

            match self.generate_batch(batch, total_batches, wanted).await {
                Some(mut generated) => {
                    if generated.len() > wanted {
                        debug!(batch, extra = generated.len() - wanted, "Dropping surplus profiles");
                        generated.truncate(wanted);
                    }
                    info!(batch, total_batches, profiles = generated.len(), "Batch generated");
                    profiles.extend(generated);
                }
                None => report.batches_failed += 1,
            }

            tokio::time::sleep(self.settings.inter_batch_delay()).await;
        }

        report.profiles_generated = profiles.len();
        info!(profiles = profiles.len(), "Generation complete, uploading");

        for profile in profiles {
            if self.upload(profile).await {
                report.profiles_uploaded += 1;
            }
        }

        info!(
            batches_attempted = report.batches_attempted,
            batches_failed = report.batches_failed,
            profiles_generated = report.profiles_generated,
            profiles_uploaded = report.profiles_uploaded,
            "Generator finished"
        );
        report
    }

    /// One batch with retries; `None` once every attempt failed
    async fn generate_batch(
        &self,
        batch: usize,
        total_batches: usize,
        count: usize,
    ) -> Option<Vec<UserProfile>> {
        let prompt = build_prompt(count);
        let max_retries = self.settings.max_retries.max(1);

        for attempt in 1..=max_retries {
            let result = match self.generator.generate(&prompt).await {
                Ok(text) => parse_profiles(&text),
                Err(e) => Err(BatchError::from(e)),
            };

            let error = match result {
                Ok(profiles) => return Some(profiles),
                Err(error) => error,
            };

            if attempt == max_retries {
                warn!(
                    batch,
                    total_batches,
                    attempt,
                    error = %error,
                    "Max retries reached, skipping batch"
                );
                break;
            }

            let delay = self.retry_delay();
            warn!(
                batch,
                attempt,
                max_retries,
                wait_ms = delay.as_millis() as u64,
                error = %error,
                "Batch generation failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }

        None
    }

    /// Random wait between failed attempts
    fn retry_delay(&self) -> Duration {
        let min = self.settings.retry_delay_min_ms;
        let max = self.settings.retry_delay_max_ms.max(min);
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    async fn upload(&self, profile: UserProfile) -> bool {
        let record_id = Uuid::new_v4().to_string();
        let contact_name = profile.contact_name.clone();
        let record = profile.into_record(&record_id);

        let document = match serde_json::to_value(&record) {
            Ok(document) => document,
            Err(e) => {
                error!(contact_name = %contact_name, error = %e, "Could not serialize profile");
                return false;
            }
        };

        match self.store.insert(&record_id, &document).await {
            Ok(()) => {
                debug!(record_id = %record_id, contact_name = %contact_name, "Profile uploaded");
                true
            }
            Err(e) => {
                error!(
                    record_id = %record_id,
                    contact_name = %contact_name,
                    error = %e,
                    "Could not upload profile"
                );
                false
            }
        }
    }
}
