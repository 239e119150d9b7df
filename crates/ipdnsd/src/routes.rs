//! HTTP routes
//!
//! | Route | Purpose |
//! |---|---|
//! | `GET /dns` | Publish the caller's addresses (Basic auth, `ipv4`/`ipv6`/`fqdn`/`ds`) |
//! | `GET /4` | Caller's IPv4 address, `204` if it connected over IPv6 |
//! | `GET /6` | Caller's IPv6 address, `204` if it connected over IPv4 |
//! | `GET /health` | Liveness |
//!
//! The handlers translate HTTP to [`UpdateEngine::process`] and back; all
//! decisions are made in `ipdns-core`.

use crate::address;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use ipdns_core::engine::FamilyOutcome;
use ipdns_core::{AddressFamily, Error, UpdateEngine, UpdateFields, UpdateReport};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<UpdateEngine>,
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/dns", get(update_dns))
        .route("/4", get(address_v4))
        .route("/6", get(address_v6))
        .route("/health", get(health))
        .with_state(state)
}

async fn update_dns(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let fields = UpdateFields::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));

    let authorization = match headers.get(header::AUTHORIZATION).map(HeaderValue::to_str) {
        None => None,
        Some(Ok(value)) => Some(value),
        Some(Err(_)) => {
            return error_response(&Error::malformed("Authorization header is not visible ASCII"));
        }
    };

    match state.engine.process(authorization, &fields).await {
        Ok(report) => report_response(&report),
        Err(e) => error_response(&e),
    }
}

async fn address_v4(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    address_response(&headers, peer, AddressFamily::V4)
}

async fn address_v6(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    address_response(&headers, peer, AddressFamily::V6)
}

async fn health() -> &'static str {
    "ok"
}

fn address_response(headers: &HeaderMap, peer: SocketAddr, family: AddressFamily) -> Response {
    match address::client_address_of(headers, peer.ip(), family) {
        Some(ip) => ip.to_string().into_response(),
        None => {
            debug!("Client {} has no {} address", peer, family);
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

/// HTTP status for an engine error
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::MissingCredentials | Error::MalformedCredentials(_) => StatusCode::UNAUTHORIZED,
        Error::UnsupportedScheme { .. } | Error::ValidationFailed(_) => StatusCode::BAD_REQUEST,
        Error::OwnershipConflict { .. } => StatusCode::FORBIDDEN,
        Error::StoreUnavailable { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_body(err: &Error) -> Value {
    let mut body = json!({
        "error": err.kind(),
        "message": err.to_string(),
    });
    if let Error::ValidationFailed(report) = err {
        body["violations"] = json!(report.violations);
    }
    body
}

fn error_response(err: &Error) -> Response {
    let status = status_for(err);
    let mut response = (status, Json(error_body(err))).into_response();

    if status == StatusCode::UNAUTHORIZED {
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Basic realm=\"ipdns\""),
        );
    }

    response
}

fn outcome_body(outcome: &FamilyOutcome) -> Value {
    match outcome {
        Ok(result) => {
            let mut body = json!(result);
            body["status"] = json!("written");
            body
        }
        Err(e) => {
            let mut body = error_body(e);
            body["status"] = json!("failed");
            body
        }
    }
}

/// Per-family body; status follows the first failure, if any
fn report_response(report: &UpdateReport) -> Response {
    let mut body = json!({});
    for (family, outcome) in report.outcomes() {
        let key = match family {
            AddressFamily::V4 => "ipv4",
            AddressFamily::V6 => "ipv6",
        };
        body[key] = outcome_body(outcome);
    }

    let status = report.first_error().map(status_for).unwrap_or(StatusCode::OK);
    (status, Json(body)).into_response()
}
