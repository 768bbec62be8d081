use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::{CheckoutInfo, GatewayAdapter, WebhookNotice},
    domain::entities::{payment::Payment, payment_method::PaymentMethod},
    infra::{click_gateway::ClickGateway, payme_gateway::PaymeGateway},
};

/// The closed set of gateways that can settle payments.
#[derive(Clone)]
pub enum PaymentGateway {
    Click(ClickGateway),
    Payme(PaymeGateway),
}

impl GatewayAdapter for PaymentGateway {
    fn method(&self) -> PaymentMethod {
        match self {
            PaymentGateway::Click(gw) => gw.method(),
            PaymentGateway::Payme(gw) => gw.method(),
        }
    }

    fn build_checkout(&self, payment: &Payment) -> CheckoutInfo {
        match self {
            PaymentGateway::Click(gw) => gw.build_checkout(payment),
            PaymentGateway::Payme(gw) => gw.build_checkout(payment),
        }
    }

    fn verify_webhook(&self, raw: &serde_json::Value) -> bool {
        match self {
            PaymentGateway::Click(gw) => gw.verify_webhook(raw),
            PaymentGateway::Payme(gw) => gw.verify_webhook(raw),
        }
    }

    fn read_notice(&self, raw: &serde_json::Value) -> Option<WebhookNotice> {
        match self {
            PaymentGateway::Click(gw) => gw.read_notice(raw),
            PaymentGateway::Payme(gw) => gw.read_notice(raw),
        }
    }
}

/// Lookup of the configured gateway for a payment method.
#[derive(Clone)]
pub struct GatewayRegistry {
    click: PaymentGateway,
    payme: PaymentGateway,
}

impl GatewayRegistry {
    pub fn new(click: ClickGateway, payme: PaymeGateway) -> Self {
        Self {
            click: PaymentGateway::Click(click),
            payme: PaymentGateway::Payme(payme),
        }
    }

    /// # Errors
    /// `InvalidInput` for methods without a gateway adapter (Stripe).
    pub fn resolve(&self, method: PaymentMethod) -> AppResult<&PaymentGateway> {
        match method {
            PaymentMethod::Click => Ok(&self.click),
            PaymentMethod::Payme => Ok(&self.payme),
            PaymentMethod::Stripe => Err(AppError::InvalidInput("Invalid payment method".into())),
        }
    }
}
