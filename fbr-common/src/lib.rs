//! # FBR Common Library
//!
//! Shared code for the feedback-router services:
//! - Error and result types
//! - TOML/environment configuration
//! - SQLite initialization and the feedback record store
//! - Record snapshot and change-event types
//! - Text generation service (Gemini) client
//! - Tracing setup

pub mod config;
pub mod db;
pub mod error;
pub mod genai;
pub mod logging;
pub mod records;
pub mod store;

pub use error::{Error, Result};
pub use records::{ChangeBatch, ChangeType, RecordChange, RecordSnapshot};
pub use store::{RecordStore, SqliteRecordStore};
