//! Test app state builder for HTTP-level integration testing.
//!
//! `TestAppStateBuilder` wires every use case to one shared `InMemoryStore`
//! and the test gateway configs, so route tests can seed rows, call the
//! router and then inspect the store.

use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use url::Url;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        payment::{PaymentRepo, PaymentUseCases},
        settlement::{SettlementRepo, SettlementUseCases},
        subscription::{SubscriptionRepo, SubscriptionUseCases},
        user::UserRepo,
    },
    domain::entities::{payment_mode::PaymentMode, user::{User, UserRole}},
    infra::config::AppConfig,
    test_utils::{
        InMemoryStore, TEST_JWT_SECRET, click_test_config, issue_test_token, payme_test_config,
        test_gateway_registry,
    },
};

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let user = create_test_user(|_| {});
/// let builder = TestAppStateBuilder::new().with_user(user.clone());
/// let token = builder.token_for(user.id, UserRole::Student);
/// let (app_state, store) = builder.build();
/// ```
pub struct TestAppStateBuilder {
    users: Vec<User>,
    jwt_secret: SecretString,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            users: vec![],
            jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
        }
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    /// Bearer token accepted by the state this builder produces.
    pub fn token_for(&self, user_id: Uuid, role: UserRole) -> String {
        issue_test_token(user_id, role, &self.jwt_secret)
    }

    pub fn build(self) -> (AppState, Arc<InMemoryStore>) {
        let store = self
            .users
            .into_iter()
            .fold(InMemoryStore::new(), |store, user| store.with_user(user));
        let store = Arc::new(store);

        let settlement_repo = store.clone() as Arc<dyn SettlementRepo>;

        let settlement_use_cases = SettlementUseCases::new(
            settlement_repo.clone(),
            store.clone() as Arc<dyn UserRepo>,
            test_gateway_registry(),
        );
        let subscription_use_cases = SubscriptionUseCases::new(
            store.clone() as Arc<dyn SubscriptionRepo>,
            settlement_repo,
        );
        let payment_use_cases = PaymentUseCases::new(store.clone() as Arc<dyn PaymentRepo>);

        let click = click_test_config();
        let frontend_url: Url = click
            .frontend_url
            .parse()
            .expect("test frontend url should parse");

        let config = AppConfig {
            jwt_secret: self.jwt_secret,
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            bind_addr: "127.0.0.1:0".parse().expect("valid test bind addr"),
            database_url: "postgres://unused".to_string(),
            frontend_url,
            payment_mode: PaymentMode::Test,
            click,
            payme: payme_test_config(),
            sweep_interval_secs: 3600,
        };

        let app_state = AppState {
            config: Arc::new(config),
            settlement_use_cases: Arc::new(settlement_use_cases),
            subscription_use_cases: Arc::new(subscription_use_cases),
            payment_use_cases: Arc::new(payment_use_cases),
        };

        (app_state, store)
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
