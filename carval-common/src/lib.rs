//! # Carval Common Library
//!
//! Shared code for the carval valuation service including:
//! - Database initialization and row models
//! - Error taxonomy
//! - Claim and vehicle domain types
//! - Business-rules tables (severity ratios, regional multipliers)
//! - Configuration loading

pub mod config;
pub mod db;
pub mod error;
pub mod rules;
pub mod types;

pub use error::{Error, Result};
pub use rules::BusinessRules;
