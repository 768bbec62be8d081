use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::settlement::SettlementRepo,
    domain::entities::subscription::{Subscription, SubscriptionStatus, find_currently_valid},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubscriptionStats {
    pub total: i64,
    pub active: i64,
    pub expired: i64,
    pub cancelled: i64,
    pub monthly: i64,
    pub yearly: i64,
}

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>>;

    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>>;

    /// ACTIVE-status rows for the user, newest first. Window not checked.
    async fn list_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>>;

    /// Newest first.
    async fn list_all(&self) -> AppResult<Vec<Subscription>>;

    async fn stats(&self) -> AppResult<SubscriptionStats>;
}

#[derive(Clone)]
pub struct SubscriptionUseCases {
    repo: Arc<dyn SubscriptionRepo>,
    settlement_repo: Arc<dyn SettlementRepo>,
}

impl SubscriptionUseCases {
    pub fn new(repo: Arc<dyn SubscriptionRepo>, settlement_repo: Arc<dyn SettlementRepo>) -> Self {
        Self {
            repo,
            settlement_repo,
        }
    }

    pub async fn find_active_for_user_at(
        &self,
        user_id: Uuid,
        now: NaiveDateTime,
    ) -> AppResult<Option<Subscription>> {
        let active = self.repo.list_active_by_user(user_id).await?;
        Ok(find_currently_valid(&active, now).cloned())
    }

    /// Newest ACTIVE subscription whose window covers the current time.
    #[instrument(skip(self))]
    pub async fn find_active_for_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        self.find_active_for_user_at(user_id, Utc::now().naive_utc())
            .await
    }

    #[instrument(skip(self))]
    pub async fn check_user_access(&self, user_id: Uuid) -> AppResult<bool> {
        Ok(self.find_active_for_user(user_id).await?.is_some())
    }

    /// Cancel a PENDING or ACTIVE subscription. Irreversible.
    ///
    /// # Errors
    /// - `NotFound` if the subscription does not exist
    /// - `Forbidden` if the actor neither owns it nor is an admin
    /// - `Conflict` if it is already EXPIRED or CANCELLED
    #[instrument(skip(self))]
    pub async fn cancel_subscription(
        &self,
        subscription_id: Uuid,
        actor_id: Uuid,
        actor_is_admin: bool,
    ) -> AppResult<Subscription> {
        let mut tx = self.settlement_repo.begin().await?;

        let mut subscription = tx
            .lock_subscription(subscription_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if subscription.user_id != actor_id && !actor_is_admin {
            return Err(AppError::Forbidden);
        }

        if !subscription.status.is_cancellable() {
            return Err(AppError::Conflict(format!(
                "Subscription is already {}",
                subscription.status
            )));
        }

        let now = Utc::now().naive_utc();
        subscription.status = SubscriptionStatus::Cancelled;
        subscription.cancelled_at = Some(now);
        subscription.updated_at = now;

        tx.save_subscription(&subscription).await?;
        tx.commit().await?;

        info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            cancelled_by = %actor_id,
            "Subscription cancelled"
        );

        Ok(subscription)
    }

    /// Expire every ACTIVE subscription with `end_date < now`, in one
    /// transaction. Returns the number of rows transitioned.
    #[instrument(skip(self))]
    pub async fn expire_sweep(&self, now: NaiveDateTime) -> AppResult<u64> {
        let mut tx = self.settlement_repo.begin().await?;
        let expired = tx.expire_elapsed_subscriptions(now).await?;
        tx.commit().await?;
        Ok(expired)
    }

    pub async fn run_expiry_sweep(&self) -> AppResult<u64> {
        self.expire_sweep(Utc::now().naive_utc()).await
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        self.repo.list_by_user(user_id).await
    }

    pub async fn list_all(&self) -> AppResult<Vec<Subscription>> {
        self.repo.list_all().await
    }

    /// Owners and admins may read a subscription.
    pub async fn get(
        &self,
        subscription_id: Uuid,
        actor_id: Uuid,
        actor_is_admin: bool,
    ) -> AppResult<Subscription> {
        let subscription = self
            .repo
            .get_by_id(subscription_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if subscription.user_id != actor_id && !actor_is_admin {
            return Err(AppError::Forbidden);
        }
        Ok(subscription)
    }

    pub async fn stats(&self) -> AppResult<SubscriptionStats> {
        self.repo.stats().await
    }
}
