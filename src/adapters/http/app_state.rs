use std::sync::Arc;

use crate::{
    application::use_cases::{
        payment::PaymentUseCases, settlement::SettlementUseCases,
        subscription::SubscriptionUseCases,
    },
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub settlement_use_cases: Arc<SettlementUseCases>,
    pub subscription_use_cases: Arc<SubscriptionUseCases>,
    pub payment_use_cases: Arc<PaymentUseCases>,
}
