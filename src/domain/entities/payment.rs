use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{amount::Amount, payment_method::PaymentMethod, payment_status::PaymentStatus};

/// One attempted monetary transaction.
///
/// `transaction_id` and `amount` are fixed at creation. `status` moves off
/// `Pending` exactly once, through [`Payment::complete`] or [`Payment::fail`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub amount: Amount,
    pub transaction_id: String,
    pub external_transaction_id: Option<String>,
    pub description: String,
    pub metadata: serde_json::Value,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Payment {
    pub fn new_pending(
        user_id: Uuid,
        subscription_id: Option<Uuid>,
        method: PaymentMethod,
        amount: Amount,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            subscription_id,
            method,
            status: PaymentStatus::Pending,
            amount,
            transaction_id: Uuid::new_v4().to_string(),
            external_transaction_id: None,
            description: format!("Subscription payment - {}", method),
            metadata: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    /// Returns false and leaves the payment untouched if it is no longer pending.
    pub fn complete(&mut self, external_transaction_id: Option<String>, now: NaiveDateTime) -> bool {
        if !self.status.can_transition_to(PaymentStatus::Completed) {
            return false;
        }
        self.status = PaymentStatus::Completed;
        if external_transaction_id.is_some() {
            self.external_transaction_id = external_transaction_id;
        }
        self.updated_at = now;
        true
    }

    pub fn fail(&mut self, now: NaiveDateTime) -> bool {
        if !self.status.can_transition_to(PaymentStatus::Failed) {
            return false;
        }
        self.status = PaymentStatus::Failed;
        self.updated_at = now;
        true
    }
}
