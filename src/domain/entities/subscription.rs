use chrono::{Months, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::amount::Amount;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "subscription_plan", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SubscriptionPlan {
    Monthly,
    Yearly,
}

impl SubscriptionPlan {
    pub fn price(&self) -> Amount {
        match self {
            SubscriptionPlan::Monthly => Amount::from_sum(99_000),
            SubscriptionPlan::Yearly => Amount::from_sum(990_000),
        }
    }

    fn months(&self) -> u32 {
        match self {
            SubscriptionPlan::Monthly => 1,
            SubscriptionPlan::Yearly => 12,
        }
    }

    /// End of a window starting at `start`. Month-end dates clamp to the
    /// last day of the target month (Jan 31 + 1 month = Feb 28/29).
    pub fn period_end(&self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        start.checked_add_months(Months::new(self.months()))
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type, AsRefStr,
    Display, EnumString,
)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Pending,
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Pending | SubscriptionStatus::Active
        )
    }
}

/// A user's access entitlement window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub amount: Amount,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub cancelled_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Subscription {
    /// Pending subscription priced from the plan, window starting at `now`.
    pub fn new_pending(user_id: Uuid, plan: SubscriptionPlan, now: NaiveDateTime) -> Option<Self> {
        Some(Self {
            id: Uuid::new_v4(),
            user_id,
            plan,
            status: SubscriptionStatus::Pending,
            amount: plan.price(),
            start_date: now,
            end_date: plan.period_end(now)?,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// True iff the subscription is ACTIVE and `now` lies in `[start_date, end_date]`.
pub fn is_currently_valid(subscription: &Subscription, now: NaiveDateTime) -> bool {
    subscription.status == SubscriptionStatus::Active
        && subscription.start_date <= now
        && now <= subscription.end_date
}

/// Newest ACTIVE subscription that is currently valid.
///
/// Input order does not matter; candidates are ranked by `created_at`
/// descending before the validity check.
pub fn find_currently_valid(
    subscriptions: &[Subscription],
    now: NaiveDateTime,
) -> Option<&Subscription> {
    let mut active: Vec<&Subscription> = subscriptions
        .iter()
        .filter(|s| s.status == SubscriptionStatus::Active)
        .collect();
    active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    active.into_iter().find(|s| is_currently_valid(s, now))
}
