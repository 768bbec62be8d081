use chrono::NaiveDateTime;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{amount::Amount, payment::Payment};

const INVOICE_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Billing record derived 1:1 from a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub invoice_number: String,
    pub amount: Amount,
    pub tax: Amount,
    pub total: Amount,
    pub pdf_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Invoice {
    /// Untaxed invoice mirroring the payment amount.
    pub fn for_payment(payment: &Payment, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            invoice_number: generate_invoice_number(now),
            amount: payment.amount,
            tax: Amount::ZERO,
            total: payment.amount,
            pdf_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// `INV-{unix millis}-{9 base36 chars}`.
pub fn generate_invoice_number(now: NaiveDateTime) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..INVOICE_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("INV-{}-{}", now.and_utc().timestamp_millis(), suffix)
}
