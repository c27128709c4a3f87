//! # FBR Generator
//!
//! Produces synthetic customer profiles with the text generation service
//! and loads them into the feedback record store as unassigned records.

pub mod generator;
pub mod profile;

pub use generator::{GenerationReport, ProfileGenerator};
pub use profile::{CompanySize, ProductTier, UserProfile};
