use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, middleware::AuthUser},
    app_error::AppResult,
    domain::entities::payment_method::PaymentMethod,
};

#[derive(Deserialize)]
struct InitiatePayload {
    plan: String,
    method: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all))
        .route("/initiate", post(initiate))
        .route("/webhook/click", post(click_webhook))
        .route("/webhook/payme", post(payme_webhook))
        .route("/my", get(list_mine))
        .route("/stats", get(stats))
        .route("/{id}", get(get_one))
}

async fn initiate(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<InitiatePayload>,
) -> AppResult<impl IntoResponse> {
    let checkout = app_state
        .settlement_use_cases
        .initiate(user.user_id, &payload.plan, &payload.method)
        .await?;
    Ok((StatusCode::CREATED, Json(checkout)))
}

async fn click_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    handle_webhook(&app_state, PaymentMethod::Click, &headers, &body).await
}

async fn payme_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    handle_webhook(&app_state, PaymentMethod::Payme, &headers, &body).await
}

async fn handle_webhook(
    app_state: &AppState,
    method: PaymentMethod,
    headers: &HeaderMap,
    body: &[u8],
) -> AppResult<Json<serde_json::Value>> {
    let raw = parse_webhook_body(headers, body);
    let ack = app_state
        .settlement_use_cases
        .handle_webhook(method, &raw)
        .await?;
    tracing::debug!(payment_id = %ack.payment_id, status = %ack.status, "Webhook acknowledged");
    Ok(Json(serde_json::json!({ "success": true })))
}

/// Gateways post either JSON or a urlencoded form. Anything unreadable
/// becomes `null`, which no gateway verifies.
fn parse_webhook_body(headers: &HeaderMap, body: &[u8]) -> serde_json::Value {
    let is_form = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let fields: serde_json::Map<String, serde_json::Value> = url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), serde_json::Value::String(v.into_owned())))
            .collect();
        return serde_json::Value::Object(fields);
    }

    serde_json::from_slice(body).unwrap_or(serde_json::Value::Null)
}

async fn list_mine(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let payments = app_state
        .payment_use_cases
        .list_for_user(user.user_id)
        .await?;
    Ok(Json(payments))
}

async fn list_all(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    let payments = app_state.payment_use_cases.list_all().await?;
    Ok(Json(payments))
}

async fn stats(State(app_state): State<AppState>, user: AuthUser) -> AppResult<impl IntoResponse> {
    user.require_admin()?;
    let stats = app_state.payment_use_cases.stats().await?;
    Ok(Json(stats))
}

async fn get_one(
    State(app_state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let payment = app_state
        .payment_use_cases
        .get(id, user.user_id, user.is_admin())
        .await?;
    Ok(Json(payment))
}
