//! In-memory store implementing every repository trait.
//!
//! One `tokio::sync::Mutex` guards the whole state. A transaction holds the
//! owned guard for its lifetime and mutates a private copy, which replaces
//! the shared state only on commit. Transactions are therefore fully
//! serialised, and dropping one is a rollback.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::CorrelationKey,
        use_cases::{
            payment::{PaymentRepo, PaymentStats},
            settlement::{SettlementRepo, SettlementTx},
            subscription::{SubscriptionRepo, SubscriptionStats},
            user::UserRepo,
        },
    },
    domain::entities::{
        amount::Amount,
        invoice::Invoice,
        payment::Payment,
        payment_method::PaymentMethod,
        payment_status::PaymentStatus,
        subscription::{Subscription, SubscriptionPlan, SubscriptionStatus},
        user::User,
    },
};

/// Where an armed failure fires. Each arm fires once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    InsertInvoice,
    SavePayment,
    SaveSubscription,
    Commit,
}

#[derive(Clone, Default)]
struct StoreState {
    users: HashMap<Uuid, User>,
    subscriptions: HashMap<Uuid, Subscription>,
    payments: HashMap<Uuid, Payment>,
    invoices: HashMap<Uuid, Invoice>,
    /// Committed row writes, for asserting that replays write nothing.
    writes: u64,
}

fn newest_first<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Arc<AsyncMutex<StoreState>>,
    fail_point: Arc<Mutex<Option<FailPoint>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: User) -> Self {
        self.locked().users.insert(user.id, user);
        self
    }

    /// Arm a one-shot failure.
    pub fn fail_at(&self, point: FailPoint) {
        *self.fail_point.lock().unwrap() = Some(point);
    }

    // Sync helpers below must not be called while a transaction is open.
    fn locked(&self) -> tokio::sync::MutexGuard<'_, StoreState> {
        self.state
            .try_lock()
            .expect("store is locked by an open transaction")
    }

    pub fn insert_subscription(&self, subscription: Subscription) {
        self.locked()
            .subscriptions
            .insert(subscription.id, subscription);
    }

    /// Insert a payment along with its generated invoice.
    pub fn insert_payment_with_invoice(&self, payment: Payment) -> Invoice {
        let invoice = Invoice::for_payment(&payment, payment.created_at);
        let mut state = self.locked();
        state.invoices.insert(invoice.id, invoice.clone());
        state.payments.insert(payment.id, payment);
        invoice
    }

    pub fn subscription(&self, id: Uuid) -> Option<Subscription> {
        self.locked().subscriptions.get(&id).cloned()
    }

    /// All subscriptions, oldest first.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let mut rows: Vec<Subscription> = self.locked().subscriptions.values().cloned().collect();
        rows.sort_by_key(|s| (s.created_at, s.id));
        rows
    }

    /// All payments, oldest first.
    pub fn payments(&self) -> Vec<Payment> {
        let mut rows: Vec<Payment> = self.locked().payments.values().cloned().collect();
        rows.sort_by_key(|p| (p.created_at, p.id));
        rows
    }

    pub fn invoices(&self) -> Vec<Invoice> {
        self.locked().invoices.values().cloned().collect()
    }

    pub fn write_count(&self) -> u64 {
        self.locked().writes
    }
}

#[async_trait]
impl UserRepo for InMemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl SubscriptionRepo for InMemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self.state.lock().await.subscriptions.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        let state = self.state.lock().await;
        let rows = state
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |s: &Subscription| s.created_at))
    }

    async fn list_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        let state = self.state.lock().await;
        let rows = state
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id && s.status == SubscriptionStatus::Active)
            .cloned()
            .collect();
        Ok(newest_first(rows, |s: &Subscription| s.created_at))
    }

    async fn list_all(&self) -> AppResult<Vec<Subscription>> {
        let state = self.state.lock().await;
        let rows = state.subscriptions.values().cloned().collect();
        Ok(newest_first(rows, |s: &Subscription| s.created_at))
    }

    async fn stats(&self) -> AppResult<SubscriptionStats> {
        let state = self.state.lock().await;
        let subs: Vec<&Subscription> = state.subscriptions.values().collect();
        let count_status =
            |status: SubscriptionStatus| subs.iter().filter(|s| s.status == status).count() as i64;
        let count_plan =
            |plan: SubscriptionPlan| subs.iter().filter(|s| s.plan == plan).count() as i64;
        Ok(SubscriptionStats {
            total: subs.len() as i64,
            active: count_status(SubscriptionStatus::Active),
            expired: count_status(SubscriptionStatus::Expired),
            cancelled: count_status(SubscriptionStatus::Cancelled),
            monthly: count_plan(SubscriptionPlan::Monthly),
            yearly: count_plan(SubscriptionPlan::Yearly),
        })
    }
}

#[async_trait]
impl PaymentRepo for InMemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Payment>> {
        Ok(self.state.lock().await.payments.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Payment>> {
        let state = self.state.lock().await;
        let rows = state
            .payments
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p: &Payment| p.created_at))
    }

    async fn list_all(&self) -> AppResult<Vec<Payment>> {
        let state = self.state.lock().await;
        let rows = state.payments.values().cloned().collect();
        Ok(newest_first(rows, |p: &Payment| p.created_at))
    }

    async fn get_invoice_by_payment(&self, payment_id: Uuid) -> AppResult<Option<Invoice>> {
        let state = self.state.lock().await;
        Ok(state
            .invoices
            .values()
            .find(|i| i.payment_id == payment_id)
            .cloned())
    }

    async fn stats(&self) -> AppResult<PaymentStats> {
        let state = self.state.lock().await;
        let payments: Vec<&Payment> = state.payments.values().collect();
        let count = |status: PaymentStatus| payments.iter().filter(|p| p.status == status).count() as i64;
        let revenue = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .map(|p| p.amount.tiyin())
            .sum();
        Ok(PaymentStats {
            total: payments.len() as i64,
            completed: count(PaymentStatus::Completed),
            pending: count(PaymentStatus::Pending),
            failed: count(PaymentStatus::Failed),
            total_revenue: Amount::from_tiyin(revenue),
        })
    }
}

#[async_trait]
impl SettlementRepo for InMemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn SettlementTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTx {
            guard,
            working,
            fail_point: self.fail_point.clone(),
        }))
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<StoreState>,
    working: StoreState,
    fail_point: Arc<Mutex<Option<FailPoint>>>,
}

impl InMemoryTx {
    fn check(&self, point: FailPoint) -> AppResult<()> {
        let mut armed = self.fail_point.lock().unwrap();
        if *armed == Some(point) {
            *armed = None;
            return Err(AppError::Database("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SettlementTx for InMemoryTx {
    async fn lock_user_subscriptions(&mut self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        Ok(self
            .working
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn lock_payment(
        &mut self,
        method: PaymentMethod,
        key: &CorrelationKey,
    ) -> AppResult<Option<Payment>> {
        let mut payments = self.working.payments.values().filter(|p| p.method == method);
        let by_external = key.external_transaction_id.as_ref().and_then(|ext| {
            payments
                .clone()
                .find(|p| p.external_transaction_id.as_ref() == Some(ext))
        });
        let found = by_external.or_else(|| {
            key.transaction_id
                .as_ref()
                .and_then(|tx| payments.find(|p| &p.transaction_id == tx))
        });
        Ok(found.cloned())
    }

    async fn lock_subscription(&mut self, id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self.working.subscriptions.get(&id).cloned())
    }

    async fn insert_subscription(&mut self, subscription: &Subscription) -> AppResult<()> {
        self.working
            .subscriptions
            .insert(subscription.id, subscription.clone());
        self.working.writes += 1;
        Ok(())
    }

    async fn insert_payment(&mut self, payment: &Payment) -> AppResult<()> {
        if self
            .working
            .payments
            .values()
            .any(|p| p.transaction_id == payment.transaction_id)
        {
            return Err(AppError::Conflict("A record with this value already exists".into()));
        }
        self.working.payments.insert(payment.id, payment.clone());
        self.working.writes += 1;
        Ok(())
    }

    async fn insert_invoice(&mut self, invoice: &Invoice) -> AppResult<()> {
        self.check(FailPoint::InsertInvoice)?;
        if self.working.invoices.values().any(|i| {
            i.payment_id == invoice.payment_id || i.invoice_number == invoice.invoice_number
        }) {
            return Err(AppError::Conflict("A record with this value already exists".into()));
        }
        self.working.invoices.insert(invoice.id, invoice.clone());
        self.working.writes += 1;
        Ok(())
    }

    async fn save_payment(&mut self, payment: &Payment) -> AppResult<()> {
        self.check(FailPoint::SavePayment)?;
        match self.working.payments.get_mut(&payment.id) {
            Some(row) => {
                *row = payment.clone();
                self.working.writes += 1;
                Ok(())
            }
            None => Err(AppError::NotFound),
        }
    }

    async fn save_subscription(&mut self, subscription: &Subscription) -> AppResult<()> {
        self.check(FailPoint::SaveSubscription)?;
        match self.working.subscriptions.get_mut(&subscription.id) {
            Some(row) => {
                *row = subscription.clone();
                self.working.writes += 1;
                Ok(())
            }
            None => Err(AppError::NotFound),
        }
    }

    async fn expire_elapsed_subscriptions(&mut self, now: NaiveDateTime) -> AppResult<u64> {
        let mut expired = 0;
        for subscription in self.working.subscriptions.values_mut() {
            if subscription.status == SubscriptionStatus::Active && subscription.end_date < now {
                subscription.status = SubscriptionStatus::Expired;
                subscription.updated_at = now;
                expired += 1;
            }
        }
        self.working.writes += expired;
        Ok(expired)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.check(FailPoint::Commit)?;
        let InMemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }
}
