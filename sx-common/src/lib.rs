//! # Syntaxia Common Library
//!
//! Shared code for the Syntaxia services including:
//! - Database initialization, migrations and row models
//! - Configuration loading
//! - Subscription entitlement resolution

pub mod config;
pub mod db;
pub mod error;
pub mod subscription;

pub use error::{Error, Result};
pub use subscription::{is_subscription_active, SubscriptionTier};
