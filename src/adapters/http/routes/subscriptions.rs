use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, middleware::AuthUser},
    app_error::AppResult,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessResponse {
    has_access: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all))
        .route("/my", get(list_mine))
        .route("/active", get(active))
        .route("/check-access", get(check_access))
        .route("/stats", get(stats))
        .route("/{id}", get(get_one).delete(cancel))
}

async fn list_mine(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let subscriptions = app_state
        .subscription_use_cases
        .list_for_user(user.user_id)
        .await?;
    Ok(Json(subscriptions))
}

async fn active(State(app_state): State<AppState>, user: AuthUser) -> AppResult<impl IntoResponse> {
    let subscription = app_state
        .subscription_use_cases
        .find_active_for_user(user.user_id)
        .await?;
    Ok(Json(subscription))
}

async fn check_access(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let has_access = app_state
        .subscription_use_cases
        .check_user_access(user.user_id)
        .await?;
    Ok(Json(AccessResponse { has_access }))
}

async fn list_all(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    let subscriptions = app_state.subscription_use_cases.list_all().await?;
    Ok(Json(subscriptions))
}

async fn stats(State(app_state): State<AppState>, user: AuthUser) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    let stats = app_state.subscription_use_cases.stats().await?;
    Ok(Json(stats))
}

async fn get_one(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let subscription = app_state
        .subscription_use_cases
        .get(id, user.user_id, user.is_admin())
        .await?;
    Ok(Json(subscription))
}

async fn cancel(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let subscription = app_state
        .subscription_use_cases
        .cancel_subscription(id, user.user_id, user.is_admin())
        .await?;
    Ok(Json(subscription))
}
