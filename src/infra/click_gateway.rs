use md5::{Digest, Md5};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{
    application::ports::payment_gateway::{
        CheckoutInfo, CorrelationKey, GatewayAdapter, WebhookNotice, constant_time_compare,
        string_or_number,
    },
    domain::entities::{amount::Amount, payment::Payment, payment_method::PaymentMethod},
};

const CLICK_INVOICE_URL: &str = "https://api.click.uz/v2/merchant/invoice/create";
const CLICK_PAID_MARKER: &str = "paid";

#[derive(Clone)]
pub struct ClickConfig {
    pub merchant_id: String,
    pub service_id: String,
    pub secret_key: SecretString,
    pub merchant_user_id: String,
    /// Frontend origin for the return/cancel redirects.
    pub frontend_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClickCheckout<'a> {
    payment_url: &'a str,
    merchant_id: &'a str,
    service_id: &'a str,
    transaction_id: &'a str,
    /// Sums, as a JSON number.
    amount: serde_json::Number,
    sign: String,
    return_url: String,
    cancel_url: String,
}

/// Fields Click posts to the prepare/complete callback that take part in
/// verification.
#[derive(Debug, Deserialize)]
struct ClickWebhook {
    #[serde(deserialize_with = "string_or_number")]
    click_trans_id: String,
    #[serde(deserialize_with = "string_or_number")]
    merchant_trans_id: String,
    #[serde(deserialize_with = "string_or_number")]
    amount: String,
    #[serde(deserialize_with = "string_or_number")]
    sign_time: String,
    sign_string: String,
    #[serde(default)]
    status: Option<serde_json::Value>,
}

/// Click (click.uz) gateway adapter. MD5 signatures, amounts in sums.
#[derive(Clone)]
pub struct ClickGateway {
    config: ClickConfig,
}

impl ClickGateway {
    pub fn new(config: ClickConfig) -> Self {
        Self { config }
    }

    fn md5_hex(data: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Checkout sign: `md5(merchant_id + transaction_id + amount + secret)`.
    pub fn checkout_sign(&self, transaction_id: &str, amount: &str) -> String {
        Self::md5_hex(&format!(
            "{}{}{}{}",
            self.config.merchant_id,
            transaction_id,
            amount,
            self.config.secret_key.expose_secret()
        ))
    }

    /// Webhook sign:
    /// `md5(service_id + click_trans_id + merchant_trans_id + amount + sign_time + secret)`.
    ///
    /// Field values are hashed exactly as declared in the payload.
    pub fn webhook_sign(
        &self,
        click_trans_id: &str,
        merchant_trans_id: &str,
        amount: &str,
        sign_time: &str,
    ) -> String {
        Self::md5_hex(&format!(
            "{}{}{}{}{}{}",
            self.config.service_id,
            click_trans_id,
            merchant_trans_id,
            amount,
            sign_time,
            self.config.secret_key.expose_secret()
        ))
    }

    fn redirect_url(&self, path: &str) -> String {
        format!("{}{}", self.config.frontend_url.trim_end_matches('/'), path)
    }

    fn parse(raw: &serde_json::Value) -> Option<ClickWebhook> {
        serde_json::from_value(raw.clone()).ok()
    }

    fn is_paid(status: &Option<serde_json::Value>) -> bool {
        matches!(status, Some(serde_json::Value::String(s)) if s == CLICK_PAID_MARKER)
    }
}

impl GatewayAdapter for ClickGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Click
    }

    fn build_checkout(&self, payment: &Payment) -> CheckoutInfo {
        let checkout = ClickCheckout {
            payment_url: CLICK_INVOICE_URL,
            merchant_id: &self.config.merchant_id,
            service_id: &self.config.service_id,
            transaction_id: &payment.transaction_id,
            sign: self.checkout_sign(&payment.transaction_id, &payment.amount.to_sum_plain()),
            amount: payment.amount.to_sum_number(),
            return_url: self.redirect_url("/payment/success"),
            cancel_url: self.redirect_url("/payment/cancel"),
        };
        CheckoutInfo(serde_json::to_value(checkout).unwrap_or_default())
    }

    fn verify_webhook(&self, raw: &serde_json::Value) -> bool {
        let Some(hook) = Self::parse(raw) else {
            return false;
        };
        let expected = self.webhook_sign(
            &hook.click_trans_id,
            &hook.merchant_trans_id,
            &hook.amount,
            &hook.sign_time,
        );
        constant_time_compare(&expected, &hook.sign_string.to_ascii_lowercase())
    }

    fn read_notice(&self, raw: &serde_json::Value) -> Option<WebhookNotice> {
        let hook = Self::parse(raw)?;
        Some(WebhookNotice {
            correlation: CorrelationKey::by_transaction_id(hook.merchant_trans_id),
            is_success: Self::is_paid(&hook.status),
            declared_amount: Amount::parse_sum(&hook.amount),
            external_transaction_id: Some(hook.click_trans_id),
        })
    }
}
