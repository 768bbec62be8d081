use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::application::use_cases::subscription::SubscriptionUseCases;

/// Periodically expires ACTIVE subscriptions whose window has elapsed.
/// Failures are logged and the next tick retries.
pub async fn run_expiry_sweeper_loop(subscription_uc: Arc<SubscriptionUseCases>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Subscription expiry sweeper started (every {}s)", every.as_secs());

    loop {
        ticker.tick().await;
        sweep_once(&subscription_uc).await;
    }
}

async fn sweep_once(subscription_uc: &SubscriptionUseCases) -> Option<u64> {
    match subscription_uc.run_expiry_sweep().await {
        Ok(expired) => {
            info!(expired, "Subscription expiry sweep finished");
            Some(expired)
        }
        Err(e) => {
            error!(error = %e, "Subscription expiry sweep failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    use crate::application::use_cases::{
        settlement::SettlementRepo, subscription::SubscriptionRepo,
    };
    use crate::domain::entities::subscription::SubscriptionStatus;
    use crate::test_utils::{FailPoint, InMemoryStore, create_test_subscription};

    fn use_cases(store: &Arc<InMemoryStore>) -> SubscriptionUseCases {
        SubscriptionUseCases::new(
            store.clone() as Arc<dyn SubscriptionRepo>,
            store.clone() as Arc<dyn SettlementRepo>,
        )
    }

    #[tokio::test]
    async fn sweep_once_expires_elapsed_rows() {
        let store = Arc::new(InMemoryStore::new());
        let user_id = uuid::Uuid::new_v4();
        let elapsed = create_test_subscription(user_id, |s| {
            s.status = SubscriptionStatus::Active;
            s.end_date = Utc::now().naive_utc() - ChronoDuration::hours(1);
        });
        let current = create_test_subscription(user_id, |s| {
            s.status = SubscriptionStatus::Active;
        });
        store.insert_subscription(elapsed.clone());
        store.insert_subscription(current.clone());

        assert_eq!(sweep_once(&use_cases(&store)).await, Some(1));
        assert_eq!(
            store.subscription(elapsed.id).unwrap().status,
            SubscriptionStatus::Expired
        );
        assert_eq!(
            store.subscription(current.id).unwrap().status,
            SubscriptionStatus::Active
        );
    }

    #[tokio::test]
    async fn failed_sweep_is_swallowed() {
        let store = Arc::new(InMemoryStore::new());
        store.fail_at(FailPoint::Commit);
        assert_eq!(sweep_once(&use_cases(&store)).await, None);
        assert_eq!(sweep_once(&use_cases(&store)).await, Some(0));
    }
}
