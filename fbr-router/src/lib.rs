//! fbr-router library interface
//!
//! Live routing loop: watches the record store for unassigned feedback,
//! classifies each transcript into a topic and writes the handling queue
//! back onto the record.

pub mod classifier;
pub mod dispatcher;
pub mod routing;
pub mod topic;

pub use classifier::{ClassifierClient, RetryPolicy, TopicClassifier};
pub use dispatcher::{ChangeDispatcher, DispatchOutcome, DispatchStats, DispatchTiming};
pub use routing::{QueueRoute, RoutingTable, GENERAL_QUEUE};
pub use topic::Topic;
