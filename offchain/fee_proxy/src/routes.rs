use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use engine::{CalcOutcome, CalcRequest, Calculation, DomainError};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::okx::{FeeQuery, OkxClient};
use crate::quote::FeeQuote;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub okx: OkxClient,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let okx = OkxClient::new(config.base_url.clone(), config.timeout)?;
        Ok(Self { config: Arc::new(config), okx })
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    Router::new()
        .route("/api/okx-fee", get(okx_fee).fallback(method_not_allowed))
        .route("/api/calc", post(calc))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeParams {
    inst_type: Option<String>,
    group_id: Option<String>,
    inst_id: Option<String>,
}

impl From<FeeParams> for FeeQuery {
    fn from(p: FeeParams) -> Self {
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());
        FeeQuery {
            inst_type: present(p.inst_type).unwrap_or_else(|| "SWAP".to_string()),
            group_id: present(p.group_id),
            inst_id: present(p.inst_id),
        }
    }
}

async fn okx_fee(State(state): State<AppState>, Query(params): Query<FeeParams>) -> Result<Json<FeeQuote>, ProxyError> {
    let creds = state.config.credentials().inspect_err(|e| warn!("{e}"))?;
    let query = FeeQuery::from(params);
    let quote = state.okx.trade_fee(&creds, &query).await?;
    Ok(Json(quote))
}

async fn method_not_allowed() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, Json(json!({"error": "Method not allowed"}))).into_response()
}

async fn calc(body: Bytes) -> Response {
    let req: CalcRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return bad_request(format!("invalid calculation request: {e}")),
    };
    match engine::evaluate(&req) {
        Ok(CalcOutcome::Single(c)) => {
            debug!(op = req.op_name(), value = c.value, "calculated");
            Json(calculation_body(&c)).into_response()
        }
        Ok(CalcOutcome::BothSides(est)) => {
            debug!(op = req.op_name(), long = est.long.is_ok(), short = est.short.is_ok(), "calculated both sides");
            Json(json!({"long": side_body(&est.long), "short": side_body(&est.short)})).into_response()
        }
        Err(e) => bad_request(e.to_string()),
    }
}

fn calculation_body(c: &Calculation) -> Value {
    json!({"value": c.value, "display": c.display(), "explanation": c.explanation})
}

// one side may fail while the other still has an estimate
fn side_body(side: &Result<Calculation, DomainError>) -> Value {
    match side {
        Ok(c) => calculation_body(c),
        Err(e) => json!({"error": e.to_string()}),
    }
}

fn bad_request(error: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": error}))).into_response()
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({"ok": true, "credentials": state.config.has_credentials()}))
}
