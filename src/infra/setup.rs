use crate::{
    adapters::http::app_state::AppState,
    infra::{
        click_gateway::ClickGateway, config::AppConfig, payme_gateway::PaymeGateway,
        postgres_persistence,
    },
    use_cases::{
        payment::{PaymentRepo, PaymentUseCases},
        payment_gateway_registry::GatewayRegistry,
        settlement::{SettlementRepo, SettlementUseCases},
        subscription::{SubscriptionRepo, SubscriptionUseCases},
        user::UserRepo,
    },
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let settlement_repo_arc = postgres_arc.clone() as Arc<dyn SettlementRepo>;

    let gateways = GatewayRegistry::new(
        ClickGateway::new(config.click.clone()),
        PaymeGateway::new(config.payme.clone()),
    );

    let settlement_use_cases = SettlementUseCases::new(
        settlement_repo_arc.clone(),
        postgres_arc.clone() as Arc<dyn UserRepo>,
        gateways,
    );

    let subscription_use_cases = SubscriptionUseCases::new(
        postgres_arc.clone() as Arc<dyn SubscriptionRepo>,
        settlement_repo_arc,
    );

    let payment_use_cases = PaymentUseCases::new(postgres_arc.clone() as Arc<dyn PaymentRepo>);

    tracing::info!(mode = %config.payment_mode, "Payment gateways configured");

    Ok(AppState {
        config: Arc::new(config),
        settlement_use_cases: Arc::new(settlement_use_cases),
        subscription_use_cases: Arc::new(subscription_use_cases),
        payment_use_cases: Arc::new(payment_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "eduhive=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
