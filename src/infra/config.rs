use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::{
    domain::entities::payment_mode::PaymentMode,
    infra::{click_gateway::ClickConfig, payme_gateway::PaymeConfig},
};

pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Where gateways send the user back after checkout.
    pub frontend_url: Url,
    pub payment_mode: PaymentMode,
    pub click: ClickConfig,
    pub payme: PaymeConfig,
    /// Expiry sweeper cadence.
    pub sweep_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");
        let frontend_url: Url = get_env_default(
            "FRONTEND_URL",
            "http://localhost:3000".parse().unwrap(),
        );
        let payment_mode: PaymentMode = get_env_default("PAYMENT_MODE", PaymentMode::Test);
        let sweep_interval_secs: u64 = get_env_default("SUBSCRIPTION_SWEEP_INTERVAL_SECS", 3600);

        let frontend_base = frontend_url.as_str().trim_end_matches('/').to_string();

        let click = ClickConfig {
            merchant_id: get_env("CLICK_MERCHANT_ID"),
            service_id: get_env("CLICK_SERVICE_ID"),
            secret_key: SecretString::new(get_env::<String>("CLICK_SECRET_KEY").into()),
            merchant_user_id: get_env("CLICK_MERCHANT_USER_ID"),
            frontend_url: frontend_base,
        };

        let payme = PaymeConfig {
            merchant_id: get_env("PAYME_MERCHANT_ID"),
            key: SecretString::new(get_env::<String>("PAYME_KEY").into()),
            test_key: SecretString::new(get_env::<String>("PAYME_TEST_KEY").into()),
            mode: payment_mode,
        };

        Self {
            jwt_secret,
            cors_origin,
            bind_addr,
            database_url,
            frontend_url,
            payment_mode,
            click,
            payme,
            sweep_interval_secs,
        }
    }
}
