//! Topic → handling queue routing
//!
//! The table is built once at startup and shared read-only. Queues are
//! checked in declaration order; the first queue accepting the topic wins.

use crate::topic::Topic;

/// Queue for topics no declared queue accepts
pub const GENERAL_QUEUE: &str = "General Queue";

/// A named handling queue and the topics it accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRoute {
    pub name: String,
    pub topics: Vec<Topic>,
}

impl QueueRoute {
    pub fn new(name: impl Into<String>, topics: Vec<Topic>) -> Self {
        Self {
            name: name.into(),
            topics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    routes: Vec<QueueRoute>,
}

impl RoutingTable {
    pub fn new(routes: Vec<QueueRoute>) -> Self {
        Self { routes }
    }

    /// Queue for `topic`, or [`GENERAL_QUEUE`] when nothing matches
    pub fn resolve(&self, topic: &Topic) -> &str {
        self.routes
            .iter()
            .find(|route| route.topics.contains(topic))
            .map(|route| route.name.as_str())
            .unwrap_or(GENERAL_QUEUE)
    }

    /// Declared queue names, in lookup order
    pub fn queues(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|route| route.name.as_str())
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new(vec![
            QueueRoute::new(
                "Product & Features Team",
                vec![Topic::FeatureRequest, Topic::PerformanceIssue],
            ),
            QueueRoute::new("UX Research Team", vec![Topic::UiUxExperience]),
            QueueRoute::new("Sales & Billing Team", vec![Topic::PricingBilling]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_classifiable_topic_has_one_queue() {
        let table = RoutingTable::default();
        let expected = [
            (Topic::UiUxExperience, "UX Research Team"),
            (Topic::FeatureRequest, "Product & Features Team"),
            (Topic::PricingBilling, "Sales & Billing Team"),
            (Topic::PerformanceIssue, "Product & Features Team"),
        ];

        for (topic, queue) in expected {
            assert_eq!(table.resolve(&topic), queue, "topic {}", topic);
            let accepting = table
                .routes
                .iter()
                .filter(|route| route.topics.contains(&topic))
                .count();
            assert_eq!(accepting, 1, "topic {} accepted by {} queues", topic, accepting);
        }
    }

    #[test]
    fn test_fallback_topics_go_to_general_queue() {
        let table = RoutingTable::default();
        assert_eq!(table.resolve(&Topic::Uncategorized), GENERAL_QUEUE);
        assert_eq!(
            table.resolve(&Topic::Unrecognized("Security Concern".to_string())),
            GENERAL_QUEUE
        );
    }

    #[test]
    fn test_first_declared_queue_wins() {
        let table = RoutingTable::new(vec![
            QueueRoute::new("First", vec![Topic::FeatureRequest]),
            QueueRoute::new("Second", vec![Topic::FeatureRequest, Topic::PricingBilling]),
        ]);
        assert_eq!(table.resolve(&Topic::FeatureRequest), "First");
        assert_eq!(table.resolve(&Topic::PricingBilling), "Second");
    }

    #[test]
    fn test_queue_order() {
        let table = RoutingTable::default();
        let queues: Vec<_> = table.queues().collect();
        assert_eq!(
            queues,
            vec!["Product & Features Team", "UX Research Team", "Sales & Billing Team"]
        );
    }

    #[test]
    fn test_empty_table() {
        let table = RoutingTable::new(Vec::new());
        assert_eq!(table.resolve(&Topic::PricingBilling), GENERAL_QUEUE);
    }
}
