//! Call Screen - Incoming Call Screening Engine
//!
//! A Rust library that decides, for each incoming phone call, whether to let it
//! ring or block it.
//!
//! # Features
//!
//! - Phone number normalization to E.164 using libphonenumber metadata
//! - Number matching that tolerates national and international dialing forms
//! - Prefix rules scoped to a country code or to any national number
//! - Blocking of anonymous callers, with emergency numbers always let through
//! - SQLite or in-memory rule storage and a blocked-call event log
//! - Daily digest of blocked calls

/// Configuration management
pub mod config;
/// Database operations and connection pooling
pub mod db;
/// Daily blocked-call summary
pub mod digest;
/// Telephony capabilities used while screening
pub mod environment;
/// Error types
pub mod error;
/// Logging setup and utilities
pub mod logging;
/// Phone number matching
pub mod matcher;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Phone number normalization
pub mod normalizer;
/// Screening decision policy
pub mod policy;
/// Prefix rule matching
pub mod prefix;
/// Repository pattern for data access
pub mod repository;
/// Database schema definitions
pub mod schema;
/// Call-handling host service
pub mod service;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use db::Database;
pub use environment::{CallEnvironment, EmergencyNumbers};
pub use error::{Result, ScreenError};
pub use models::{CallResponse, Decision, DecisionReason, IncomingCall, ParsedNumber, Presentation, RuleSnapshot, Settings};
pub use policy::ScreeningPolicy;
pub use service::{ScreeningOutcome, ScreeningService};
