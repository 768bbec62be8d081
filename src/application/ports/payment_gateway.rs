use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::entities::{amount::Amount, payment::Payment, payment_method::PaymentMethod};

// ============================================================================
// Port Types - Provider-agnostic settlement types
// ============================================================================

/// Provider-specific checkout payload handed back to the client as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CheckoutInfo(pub serde_json::Value);

impl CheckoutInfo {
    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

/// How an incoming webhook is matched to a stored payment.
///
/// Lookup tries `external_transaction_id` first, then `transaction_id`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CorrelationKey {
    pub external_transaction_id: Option<String>,
    pub transaction_id: Option<String>,
}

impl CorrelationKey {
    pub fn by_transaction_id(id: impl Into<String>) -> Self {
        Self {
            external_transaction_id: None,
            transaction_id: Some(id.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.external_transaction_id.is_none() && self.transaction_id.is_none()
    }
}

impl std::fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.external_transaction_id, &self.transaction_id) {
            (Some(ext), Some(tx)) => write!(f, "external={} transaction={}", ext, tx),
            (Some(ext), None) => write!(f, "external={}", ext),
            (None, Some(tx)) => write!(f, "transaction={}", tx),
            (None, None) => write!(f, "<empty>"),
        }
    }
}

/// What a verified webhook says about its payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookNotice {
    pub correlation: CorrelationKey,
    /// Provider's own success marker was present.
    pub is_success: bool,
    pub external_transaction_id: Option<String>,
    /// Amount the provider claims was charged. `None` when the payload's
    /// amount does not parse; such a notice never matches a payment.
    pub declared_amount: Option<Amount>,
}

// ============================================================================
// Port Trait
// ============================================================================

/// Capability every gateway adapter provides.
///
/// All methods are pure: no I/O, no state. `verify_webhook` never fails;
/// a payload it cannot read is simply not authentic.
pub trait GatewayAdapter {
    fn method(&self) -> PaymentMethod;

    fn build_checkout(&self, payment: &Payment) -> CheckoutInfo;

    fn verify_webhook(&self, raw: &serde_json::Value) -> bool;

    /// Extract correlation and outcome. Returns `None` for payloads that
    /// would also fail `verify_webhook`.
    fn read_notice(&self, raw: &serde_json::Value) -> Option<WebhookNotice>;
}

// ============================================================================
// Payload helpers
// ============================================================================

/// Accepts a JSON string or number and keeps its textual form verbatim.
/// Signature checks hash the declared text, so no normalisation happens here.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}

/// Constant-time string comparison to prevent timing attacks.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
