use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::{CheckoutInfo, CorrelationKey, GatewayAdapter, WebhookNotice},
        use_cases::{payment_gateway_registry::GatewayRegistry, user::UserRepo},
    },
    domain::entities::{
        invoice::Invoice,
        payment::Payment,
        payment_method::PaymentMethod,
        payment_status::PaymentStatus,
        subscription::{Subscription, SubscriptionPlan, SubscriptionStatus, find_currently_valid},
    },
};

// ============================================================================
// Transaction port
// ============================================================================

/// Opens transactions over the payment and subscription tables.
#[async_trait]
pub trait SettlementRepo: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn SettlementTx>>;
}

/// One open transaction. Dropping it without [`SettlementTx::commit`] rolls
/// back every write made through it.
#[async_trait]
pub trait SettlementTx: Send {
    /// Every subscription of the user, row-locked until the transaction ends.
    async fn lock_user_subscriptions(&mut self, user_id: Uuid) -> AppResult<Vec<Subscription>>;

    /// Row-locks the `method` payment matching `key`, trying the external id
    /// first. Payments of other methods are never touched.
    async fn lock_payment(
        &mut self,
        method: PaymentMethod,
        key: &CorrelationKey,
    ) -> AppResult<Option<Payment>>;

    async fn lock_subscription(&mut self, id: Uuid) -> AppResult<Option<Subscription>>;

    async fn insert_subscription(&mut self, subscription: &Subscription) -> AppResult<()>;

    async fn insert_payment(&mut self, payment: &Payment) -> AppResult<()>;

    async fn insert_invoice(&mut self, invoice: &Invoice) -> AppResult<()>;

    async fn save_payment(&mut self, payment: &Payment) -> AppResult<()>;

    async fn save_subscription(&mut self, subscription: &Subscription) -> AppResult<()>;

    /// Flips every ACTIVE subscription whose `end_date < now` to EXPIRED.
    async fn expire_elapsed_subscriptions(&mut self, now: NaiveDateTime) -> AppResult<u64>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

// ============================================================================
// Results
// ============================================================================

/// Acknowledgement returned to the gateway once a webhook is handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    /// The payment had already left PENDING; nothing was written.
    pub already_settled: bool,
}

// ============================================================================
// Use cases
// ============================================================================

#[derive(Clone)]
pub struct SettlementUseCases {
    settlement_repo: Arc<dyn SettlementRepo>,
    user_repo: Arc<dyn UserRepo>,
    gateways: GatewayRegistry,
}

impl SettlementUseCases {
    pub fn new(
        settlement_repo: Arc<dyn SettlementRepo>,
        user_repo: Arc<dyn UserRepo>,
        gateways: GatewayRegistry,
    ) -> Self {
        Self {
            settlement_repo,
            user_repo,
            gateways,
        }
    }

    /// Start a checkout for `plan` paid through `method`.
    ///
    /// Creates the pending subscription, payment and invoice in one
    /// transaction that first locks the user's subscriptions, then returns
    /// the gateway's checkout payload unmodified.
    ///
    /// # Errors
    /// - `InvalidInput` for an unknown plan or an unsupported method
    /// - `NotFound` if the user does not exist
    /// - `Conflict` if the user already holds a currently valid subscription
    #[instrument(skip(self))]
    pub async fn initiate(
        &self,
        user_id: Uuid,
        plan: &str,
        method: &str,
    ) -> AppResult<CheckoutInfo> {
        let plan = SubscriptionPlan::from_str(plan)
            .map_err(|_| AppError::InvalidInput(format!("Unknown plan: {}", plan)))?;
        let method = PaymentMethod::from_str(method)
            .map_err(|_| AppError::InvalidInput(format!("Unknown payment method: {}", method)))?;
        let gateway = self.gateways.resolve(method)?;

        self.user_repo
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let now = Utc::now().naive_utc();
        let mut tx = self.settlement_repo.begin().await?;

        let existing = tx.lock_user_subscriptions(user_id).await?;
        if let Some(active) = find_currently_valid(&existing, now) {
            info!(
                user_id = %user_id,
                subscription_id = %active.id,
                "Rejected checkout: user already has an active subscription"
            );
            return Err(AppError::Conflict(
                "User already has an active subscription".into(),
            ));
        }

        let subscription = Subscription::new_pending(user_id, plan, now)
            .ok_or_else(|| AppError::Internal("Subscription window out of range".into()))?;
        let payment = Payment::new_pending(user_id, Some(subscription.id), method, plan.price(), now);
        let invoice = Invoice::for_payment(&payment, now);

        tx.insert_subscription(&subscription).await?;
        tx.insert_payment(&payment).await?;
        tx.insert_invoice(&invoice).await?;
        tx.commit().await?;

        info!(
            user_id = %user_id,
            plan = %plan,
            method = %method,
            payment_id = %payment.id,
            subscription_id = %subscription.id,
            invoice_number = %invoice.invoice_number,
            "Checkout initiated"
        );

        Ok(gateway.build_checkout(&payment))
    }

    /// Verify and settle a gateway callback.
    ///
    /// Verification happens before any storage access. Settlement itself runs
    /// in one transaction holding the payment row lock, so concurrent
    /// deliveries of the same callback serialise and converge.
    ///
    /// # Errors
    /// - `InvalidSignature` if the payload fails verification
    /// - `NotFound` if no payment matches the correlation key
    /// - `Database` if persistence fails; nothing is written in that case
    #[instrument(skip(self, raw))]
    pub async fn handle_webhook(
        &self,
        method: PaymentMethod,
        raw: &serde_json::Value,
    ) -> AppResult<WebhookAck> {
        let gateway = self.gateways.resolve(method)?;

        if !gateway.verify_webhook(raw) {
            warn!(
                method = %method,
                "Webhook signature verification failed, possible spoofing attempt"
            );
            return Err(AppError::InvalidSignature);
        }

        let notice = gateway.read_notice(raw).ok_or(AppError::InvalidSignature)?;

        let result = self.settle(method, &notice).await;
        if let Err(ref e) = result {
            if e.is_retryable() {
                error!(
                    method = %method,
                    correlation = %notice.correlation,
                    error = %e,
                    "Settlement transaction failed and was rolled back"
                );
            }
        }
        result
    }

    async fn settle(&self, method: PaymentMethod, notice: &WebhookNotice) -> AppResult<WebhookAck> {
        let mut tx = self.settlement_repo.begin().await?;

        let Some(mut payment) = tx.lock_payment(method, &notice.correlation).await? else {
            warn!(
                method = %method,
                correlation = %notice.correlation,
                "Verified webhook matches no payment, possible environment mismatch"
            );
            return Err(AppError::NotFound);
        };

        if !payment.is_pending() {
            info!(
                payment_id = %payment.id,
                status = %payment.status,
                "Webhook replay for settled payment, ignoring"
            );
            return Ok(WebhookAck {
                payment_id: payment.id,
                status: payment.status,
                already_settled: true,
            });
        }

        let now = Utc::now().naive_utc();
        // An amount that does not parse never matches.
        let amount_matches = notice.declared_amount == Some(payment.amount);
        if !amount_matches {
            warn!(
                payment_id = %payment.id,
                expected = %payment.amount,
                declared = ?notice.declared_amount,
                "Webhook amount does not match payment"
            );
        }

        if notice.is_success && amount_matches {
            payment.complete(notice.external_transaction_id.clone(), now);
            tx.save_payment(&payment).await?;

            if let Some(subscription_id) = payment.subscription_id {
                self.activate_paid_subscription(&mut *tx, &payment, subscription_id, now)
                    .await?;
            }
        } else {
            payment.fail(now);
            tx.save_payment(&payment).await?;
        }

        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            method = %method,
            status = %payment.status,
            "Payment settled"
        );

        Ok(WebhookAck {
            payment_id: payment.id,
            status: payment.status,
            already_settled: false,
        })
    }

    /// Activate the subscription a completed payment paid for.
    ///
    /// Only a PENDING subscription is activated, and only while the user has
    /// no other currently valid one. Anything else stays as it is and the
    /// payment remains COMPLETED for manual follow-up.
    async fn activate_paid_subscription(
        &self,
        tx: &mut dyn SettlementTx,
        payment: &Payment,
        subscription_id: Uuid,
        now: NaiveDateTime,
    ) -> AppResult<()> {
        let owned = tx.lock_user_subscriptions(payment.user_id).await?;

        let Some(mut subscription) = owned.iter().find(|s| s.id == subscription_id).cloned()
        else {
            warn!(
                payment_id = %payment.id,
                subscription_id = %subscription_id,
                "Paid subscription not found"
            );
            return Ok(());
        };

        if subscription.status != SubscriptionStatus::Pending {
            warn!(
                payment_id = %payment.id,
                subscription_id = %subscription.id,
                status = %subscription.status,
                "Paid subscription is no longer pending, leaving it unchanged"
            );
            return Ok(());
        }

        if let Some(current) = find_currently_valid(&owned, now) {
            warn!(
                payment_id = %payment.id,
                subscription_id = %subscription.id,
                active_subscription_id = %current.id,
                user_id = %payment.user_id,
                "User already holds an active subscription, paid subscription left pending"
            );
            return Ok(());
        }

        subscription.status = SubscriptionStatus::Active;
        subscription.updated_at = now;
        tx.save_subscription(&subscription).await
    }
}
