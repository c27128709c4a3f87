//! Transcript classification
//!
//! [`ClassifierClient`] asks the text generation service for a single topic
//! label. Every failed attempt is followed by a wait: the long cooldown for
//! rate-limit errors, the short delay for anything else. Once the attempt
//! budget is spent the client falls back to `Uncategorized`; it never
//! returns an error.

use crate::topic::Topic;
use async_trait::async_trait;
use fbr_common::config::RouterSettings;
use fbr_common::genai::{GenerationError, TextGenerator};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Anything that can turn a transcript into a topic
#[async_trait]
pub trait TopicClassifier: Send + Sync {
    async fn classify(&self, transcript: &str) -> Topic;
}

/// Attempt budget and waits between attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per transcript, including the first
    pub max_attempts: u32,
    pub rate_limit_cooldown: Duration,
    pub transient_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RouterSettings::default())
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &RouterSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            rate_limit_cooldown: settings.rate_limit_cooldown(),
            transient_delay: settings.transient_delay(),
        }
    }

    /// Wait before the next attempt after `error`
    pub fn delay_for(&self, error: &GenerationError) -> Duration {
        match error {
            GenerationError::RateLimited(_) => self.rate_limit_cooldown,
            GenerationError::Transient(_) | GenerationError::Other(_) => self.transient_delay,
        }
    }
}

/// Instruction prompt for one transcript
pub fn build_prompt(transcript: &str) -> String {
    let categories: String = Topic::CLASSIFIABLE
        .iter()
        .map(|topic| format!("- {}\n", topic.label()))
        .collect();

    format!(
        "Analyze the user feedback transcript and classify it into ONE category:\n\
         {categories}\
         Transcript: \"{transcript}\"\n\
         Return ONLY the category name."
    )
}

/// Classifier backed by a text generation service
pub struct ClassifierClient {
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
}

impl ClassifierClient {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: RetryPolicy) -> Self {
        Self { generator, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt(&self, prompt: &str) -> Result<Topic, GenerationError> {
        let text = self.generator.generate(prompt).await?;
        Topic::from_response(&text)
            .ok_or_else(|| GenerationError::Transient("empty classification response".to_string()))
    }
}

#[async_trait]
impl TopicClassifier for ClassifierClient {
    async fn classify(&self, transcript: &str) -> Topic {
        let prompt = build_prompt(transcript);
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let error = match self.attempt(&prompt).await {
                Ok(topic) => {
                    if let Topic::Unrecognized(label) = &topic {
                        warn!(label = %label, "Classifier returned a label outside the topic set");
                    }
                    debug!(attempt, topic = %topic, "Classification succeeded");
                    return topic;
                }
                Err(error) => error,
            };

            let delay = self.policy.delay_for(&error);
            match &error {
                GenerationError::RateLimited(_) => warn!(
                    attempt,
                    max_attempts,
                    wait_ms = delay.as_millis() as u64,
                    error = %error,
                    "Rate limit hit, cooling down"
                ),
                _ => warn!(
                    attempt,
                    max_attempts,
                    wait_ms = delay.as_millis() as u64,
                    error = %error,
                    "Classification failed, waiting before continuing"
                ),
            }
            // Waits after the final attempt too
            tokio::time::sleep(delay).await;
        }

        warn!(
            max_attempts,
            "Classification attempts exhausted, falling back to Uncategorized"
        );
        Topic::Uncategorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_topics_and_transcript() {
        let prompt = build_prompt("The pricing page is confusing");

        for topic in Topic::CLASSIFIABLE.iter() {
            assert!(prompt.contains(&format!("- {}\n", topic.label())));
        }
        assert!(prompt.contains("Transcript: \"The pricing page is confusing\""));
        assert!(prompt.ends_with("Return ONLY the category name."));
        assert!(!prompt.contains("Uncategorized"));
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.rate_limit_cooldown, Duration::from_secs(60));
        assert_eq!(policy.transient_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_delay_by_error_kind() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(&GenerationError::RateLimited("quota".into())),
            Duration::from_secs(60)
        );
        assert_eq!(
            policy.delay_for(&GenerationError::Transient("timeout".into())),
            Duration::from_secs(5)
        );
        assert_eq!(
            policy.delay_for(&GenerationError::Other("parse".into())),
            Duration::from_secs(5)
        );
    }
}
