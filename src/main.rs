use dotenvy::dotenv;
use tracing::info;

use eduhive::infra::{
    app::create_app,
    expiry_sweeper::run_expiry_sweeper_loop,
    setup::{init_app_state, init_tracing},
};
use std::net::SocketAddr;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let app_state = init_app_state().await?;

    // Read config values before moving app_state
    let bind_addr = app_state.config.bind_addr;
    let sweep_every = Duration::from_secs(app_state.config.sweep_interval_secs.max(1));

    tokio::spawn(run_expiry_sweeper_loop(
        app_state.subscription_use_cases.clone(),
        sweep_every,
    ));

    let app = create_app(app_state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
