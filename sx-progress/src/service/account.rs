//! Signup and billing stand-ins
//!
//! The authentication and payment providers live outside this service. These
//! operations are what their callbacks would invoke.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sx_common::db::{Subscription, User};
use sx_common::{is_subscription_active, SubscriptionTier};
use tracing::info;

use super::{require_user, ProgressionService};
use crate::caller::CallerId;
use crate::error::Result;

/// Entitlement as reported by the billing provider
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionUpdate {
    pub tier: SubscriptionTier,
    pub current_period_end: Option<DateTime<Utc>>,
    pub customer_id: Option<String>,
    pub provider_subscription_id: Option<String>,
    pub price_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatus {
    pub subscription: Subscription,
    pub active: bool,
}

impl ProgressionService {
    /// Create the caller's user row with full hearts and no points
    pub async fn register_user(&self, caller: &CallerId, name: Option<&str>) -> Result<User> {
        let user = self.store.create_user(caller.as_str(), name).await?;
        info!(user_id = caller.as_str(), "Registered user");
        Ok(user)
    }

    /// Store the caller's entitlement
    pub async fn update_subscription(
        &self,
        caller: &CallerId,
        update: SubscriptionUpdate,
    ) -> Result<SubscriptionStatus> {
        let mut uow = self.store.begin().await?;
        require_user(&mut uow, caller).await?;

        let subscription = uow
            .upsert_subscription(&Subscription {
                user_id: caller.as_str().to_string(),
                tier: update.tier,
                current_period_end: update.current_period_end,
                customer_id: update.customer_id,
                provider_subscription_id: update.provider_subscription_id,
                price_id: update.price_id,
            })
            .await?;

        uow.commit().await?;

        let active = is_subscription_active(Some(&subscription), Utc::now());
        info!(
            user_id = caller.as_str(),
            tier = %subscription.tier,
            active,
            "Updated subscription"
        );

        Ok(SubscriptionStatus {
            subscription,
            active,
        })
    }
}
