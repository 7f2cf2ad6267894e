//! Route handlers for `/ping` and `/v1/survey`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, FromRequest, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::error::ApiError;
use super::AppState;
use crate::models::{build_record, RequestContext, SurveySubmission};
use crate::AppError;

/// Body of `GET /ping`.
#[derive(Debug, Serialize)]
pub struct PingResponse {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Fixed liveness message.
    pub message: &'static str,
    /// Current UTC time, RFC 3339.
    pub utc_time: String,
}

/// Handler for `GET /ping`: liveness check with the server's UTC clock.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        message: "API is alive",
        utc_time: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
    })
}

/// Handler for `POST /v1/survey`.
///
/// Validates the body, builds the pseudonymized record and appends it to
/// the survey log before answering `201`.
///
/// # Errors
///
/// Returns an [`ApiError`] mapped to 400, 413, 422 or 500.
pub async fn submit_survey(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let headers = request.headers().clone();

    if !is_json_content_type(&headers) {
        return Err(ApiError::InvalidJson);
    }

    let body = Bytes::from_request(request, &state)
        .await
        .map_err(ApiError::Body)?;

    let payload = match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(map)) => map,
        _ => return Err(ApiError::InvalidJson),
    };

    let submission = SurveySubmission::from_object(&payload).map_err(|errors| {
        debug!(errors = errors.len(), "survey submission failed validation");
        ApiError::Validation(errors)
    })?;

    let context = RequestContext::from_parts(&headers, peer, state.forwarded_header.as_ref());
    let record = build_record(submission, &context, Utc::now());
    let submission_id = record.submission_id.clone();

    let log = Arc::clone(&state.log);
    tokio::task::spawn_blocking(move || log.append(&record))
        .await
        .map_err(|err| AppError::Io(format!("survey log task failed: {err}")))??;

    info!(%submission_id, "survey submission stored");
    Ok((StatusCode::CREATED, Json(json!({ "status": "ok" }))))
}

/// Whether the request declares a JSON body (`application/json` or `*+json`).
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}
