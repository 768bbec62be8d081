//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{Duration, NaiveDateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use uuid::Uuid;

use crate::{
    application::{jwt::Claims, use_cases::payment_gateway_registry::GatewayRegistry},
    domain::entities::{
        amount::Amount,
        payment::Payment,
        payment_method::PaymentMethod,
        payment_mode::PaymentMode,
        subscription::{Subscription, SubscriptionPlan, SubscriptionStatus},
        user::{User, UserRole},
    },
    infra::{
        click_gateway::{ClickConfig, ClickGateway},
        payme_gateway::{PaymeConfig, PaymeGateway},
    },
};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Create a test user with sensible defaults.
pub fn create_test_user(overrides: impl FnOnce(&mut User)) -> User {
    let mut user = User {
        id: Uuid::new_v4(),
        email: "student@example.com".to_string(),
        first_name: Some("Test".to_string()),
        last_name: Some("Student".to_string()),
        role: UserRole::Student,
        created_at: Some(now()),
        updated_at: Some(now()),
    };
    overrides(&mut user);
    user
}

/// Create a pending monthly subscription whose window covers now.
pub fn create_test_subscription(
    user_id: Uuid,
    overrides: impl FnOnce(&mut Subscription),
) -> Subscription {
    let now = now();
    let mut subscription = Subscription {
        id: Uuid::new_v4(),
        user_id,
        plan: SubscriptionPlan::Monthly,
        status: SubscriptionStatus::Pending,
        amount: SubscriptionPlan::Monthly.price(),
        start_date: now - Duration::days(1),
        end_date: now + Duration::days(29),
        cancelled_at: None,
        created_at: now,
        updated_at: now,
    };
    overrides(&mut subscription);
    subscription
}

/// Create a pending Click payment for 99 000 sum.
pub fn create_test_payment(overrides: impl FnOnce(&mut Payment)) -> Payment {
    let mut payment = Payment::new_pending(
        Uuid::new_v4(),
        None,
        PaymentMethod::Click,
        Amount::from_sum(99_000),
        now(),
    );
    overrides(&mut payment);
    payment
}

pub fn click_test_config() -> ClickConfig {
    ClickConfig {
        merchant_id: "click-merchant".to_string(),
        service_id: "click-service".to_string(),
        secret_key: SecretString::new("click-secret".into()),
        merchant_user_id: "click-user".to_string(),
        frontend_url: "http://localhost:3000".to_string(),
    }
}

pub fn payme_test_config() -> PaymeConfig {
    PaymeConfig {
        merchant_id: "payme-merchant".to_string(),
        key: SecretString::new("payme-live-key".into()),
        test_key: SecretString::new("payme-test-key".into()),
        mode: PaymentMode::Test,
    }
}

pub fn test_gateway_registry() -> GatewayRegistry {
    GatewayRegistry::new(
        ClickGateway::new(click_test_config()),
        PaymeGateway::new(payme_test_config()),
    )
}

/// A Click callback body signed the way Click signs it.
pub fn signed_click_webhook(
    gateway: &ClickGateway,
    merchant_trans_id: &str,
    click_trans_id: &str,
    amount: &str,
    status: &str,
) -> serde_json::Value {
    let sign_time = "2026-01-01 00:00:00";
    json!({
        "click_trans_id": click_trans_id,
        "merchant_trans_id": merchant_trans_id,
        "amount": amount,
        "sign_time": sign_time,
        "sign_string": gateway.webhook_sign(click_trans_id, merchant_trans_id, amount, sign_time),
        "status": status,
    })
}

/// A Payme notification body signed with the gateway's active key.
pub fn signed_payme_webhook(
    gateway: &PaymeGateway,
    order_id: &str,
    payme_id: &str,
    amount_tiyin: i64,
    status: impl Into<serde_json::Value>,
) -> serde_json::Value {
    let time: i64 = 1_700_000_000_000;
    json!({
        "method": "PerformTransaction",
        "params": {
            "id": payme_id,
            "time": time,
            "amount": amount_tiyin,
            "account": { "order_id": order_id },
        },
        "status": status.into(),
        "sign": gateway.webhook_sign(
            payme_id,
            order_id,
            &amount_tiyin.to_string(),
            &time.to_string(),
        ),
    })
}

pub fn issue_test_token(user_id: Uuid, role: UserRole, secret: &SecretString) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat: now,
        exp: now + 3600,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .expect("test token should encode")
}
