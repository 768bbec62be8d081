use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    application::ports::payment_gateway::{
        CheckoutInfo, CorrelationKey, GatewayAdapter, WebhookNotice, constant_time_compare,
        string_or_number,
    },
    domain::entities::{
        amount::Amount, payment::Payment, payment_method::PaymentMethod, payment_mode::PaymentMode,
    },
};

type HmacSha256 = Hmac<Sha256>;

const PAYME_CHECKOUT_URL: &str = "https://checkout.paycom.uz/api/cards.create";
const PAYME_SUCCESS_MARKER: &str = "2";

#[derive(Clone)]
pub struct PaymeConfig {
    pub merchant_id: String,
    pub key: SecretString,
    pub test_key: SecretString,
    pub mode: PaymentMode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymeCheckout<'a> {
    payment_url: &'a str,
    merchant_id: &'a str,
    transaction_id: &'a str,
    /// Sums. Only the signature is computed over tiyin.
    amount: serde_json::Number,
    sign: String,
}

#[derive(Debug, Deserialize)]
struct PaymeAccount {
    #[serde(deserialize_with = "string_or_number")]
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct PaymeParams {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(deserialize_with = "string_or_number")]
    time: String,
    #[serde(deserialize_with = "string_or_number")]
    amount: String,
    account: PaymeAccount,
}

#[derive(Debug, Deserialize)]
struct PaymeWebhook {
    // Required; only its presence is checked.
    #[serde(rename = "method")]
    _method: serde::de::IgnoredAny,
    params: PaymeParams,
    #[serde(default)]
    status: Option<serde_json::Value>,
    sign: String,
}

/// Payme (paycom.uz) gateway adapter. HMAC-SHA256 signatures, amounts in tiyin.
#[derive(Clone)]
pub struct PaymeGateway {
    config: PaymeConfig,
}

impl PaymeGateway {
    pub fn new(config: PaymeConfig) -> Self {
        Self { config }
    }

    fn active_key(&self) -> &SecretString {
        if self.config.mode.is_production() {
            &self.config.key
        } else {
            &self.config.test_key
        }
    }

    fn hmac_base64(&self, data: &str) -> String {
        // HMAC-SHA256 accepts keys of any length, so construction cannot fail.
        let Ok(mut mac) = HmacSha256::new_from_slice(self.active_key().expose_secret().as_bytes())
        else {
            return String::new();
        };
        mac.update(data.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Checkout sign: `base64(hmac(key, merchant_id + transaction_id + amount_tiyin))`.
    pub fn checkout_sign(&self, transaction_id: &str, amount_tiyin: i64) -> String {
        self.hmac_base64(&format!(
            "{}{}{}",
            self.config.merchant_id, transaction_id, amount_tiyin
        ))
    }

    /// Webhook sign:
    /// `base64(hmac(key, merchant_id + params.id + order_id + params.amount + params.time))`.
    pub fn webhook_sign(&self, payme_id: &str, order_id: &str, amount: &str, time: &str) -> String {
        self.hmac_base64(&format!(
            "{}{}{}{}{}",
            self.config.merchant_id, payme_id, order_id, amount, time
        ))
    }

    fn parse(raw: &serde_json::Value) -> Option<PaymeWebhook> {
        serde_json::from_value(raw.clone()).ok()
    }

    fn is_success(status: &Option<serde_json::Value>) -> bool {
        match status {
            Some(serde_json::Value::String(s)) => s == PAYME_SUCCESS_MARKER,
            Some(serde_json::Value::Number(n)) => n.to_string() == PAYME_SUCCESS_MARKER,
            _ => false,
        }
    }
}

impl GatewayAdapter for PaymeGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Payme
    }

    fn build_checkout(&self, payment: &Payment) -> CheckoutInfo {
        let checkout = PaymeCheckout {
            payment_url: PAYME_CHECKOUT_URL,
            merchant_id: &self.config.merchant_id,
            transaction_id: &payment.transaction_id,
            amount: payment.amount.to_sum_number(),
            sign: self.checkout_sign(&payment.transaction_id, payment.amount.tiyin()),
        };
        CheckoutInfo(serde_json::to_value(checkout).unwrap_or_default())
    }

    fn verify_webhook(&self, raw: &serde_json::Value) -> bool {
        let Some(hook) = Self::parse(raw) else {
            return false;
        };
        let expected = self.webhook_sign(
            &hook.params.id,
            &hook.params.account.order_id,
            &hook.params.amount,
            &hook.params.time,
        );
        constant_time_compare(&expected, &hook.sign)
    }

    fn read_notice(&self, raw: &serde_json::Value) -> Option<WebhookNotice> {
        let hook = Self::parse(raw)?;
        Some(WebhookNotice {
            correlation: CorrelationKey {
                external_transaction_id: Some(hook.params.id.clone()),
                transaction_id: Some(hook.params.account.order_id),
            },
            is_success: Self::is_success(&hook.status),
            declared_amount: hook.params.amount.parse::<i64>().ok().map(Amount::from_tiyin),
            external_transaction_id: Some(hook.params.id),
        })
    }
}
