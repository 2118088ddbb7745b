//! Subscription entitlement resolution
//!
//! A learner with an active paid entitlement bypasses heart gating entirely.
//! The decision is a pure function of the stored subscription row and the
//! current time, so callers pass `now` explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::models::Subscription;

/// Billing tier stored on a subscription row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum SubscriptionTier {
    Free,
    Pro,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "FREE",
            SubscriptionTier::Pro => "PRO",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the subscription grants unlimited hearts at `now`
///
/// PRO tier is always active. Otherwise the entitlement holds while the paid
/// period end lies strictly in the future. No record means no entitlement.
pub fn is_subscription_active(subscription: Option<&Subscription>, now: DateTime<Utc>) -> bool {
    let Some(sub) = subscription else {
        return false;
    };

    if sub.tier == SubscriptionTier::Pro {
        return true;
    }

    matches!(sub.current_period_end, Some(end) if end > now)
}
