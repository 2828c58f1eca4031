use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, Uri};
use axum::response::Response;
use bytes::Bytes;
use http::header::USER_AGENT;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthError;
use crate::classify::classify_request;
use crate::error::ProxyError;
use crate::pipeline::{ProxyEngine, ProxyOutcome};

pub async fn proxy_handler(
    State(engine): State<Arc<ProxyEngine>>,
    State(auth): State<Arc<dyn crate::auth::AuthProvider>>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Response {
    let trace_id = Uuid::now_v7();
    let started_at = Instant::now();

    let auth_ctx = match auth.authenticate(&headers) {
        Ok(ctx) => ctx,
        Err(err) => return auth_error_response(err),
    };

    let classified = match classify_request(
        &method,
        uri.path(),
        uri.query(),
        body,
        engine.max_body_bytes(),
    ) {
        Ok(c) => c,
        Err(err) => return error_response(err),
    };

    info!(
        event = "downstream_received",
        trace_id = %trace_id,
        family = %classified.family,
        path = %uri.path(),
        is_stream = classified.is_stream,
    );

    let client_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim().to_string());
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let result = engine
        .handle(trace_id, auth_ctx, classified, client_ip, user_agent)
        .await;

    match result {
        Ok(ProxyOutcome::Json(outcome)) => {
            info!(
                event = "downstream_responded",
                trace_id = %trace_id,
                status = outcome.status,
                elapsed_ms = started_at.elapsed().as_millis(),
                is_stream = false,
            );
            json_response(outcome.status, outcome.body, &trace_id)
        }
        Ok(ProxyOutcome::Stream(outcome)) => {
            info!(
                event = "downstream_responded",
                trace_id = %trace_id,
                status = outcome.status,
                elapsed_ms = started_at.elapsed().as_millis(),
                is_stream = true,
            );
            stream_response(outcome.status, outcome.body, &trace_id)
        }
        Err(err) => {
            warn!(
                event = "downstream_responded",
                trace_id = %trace_id,
                status = err.status.as_u16(),
                elapsed_ms = started_at.elapsed().as_millis(),
            );
            error_response(err)
        }
    }
}

/// `GET .../models`: not forwarded to any account, served straight from the
/// static embedded catalog, namespaced and narrowed to a path-prefixed
/// platform the same way `classify_request` derives one for the forwarding
/// routes.
pub async fn list_models_handler(
    State(auth): State<Arc<dyn crate::auth::AuthProvider>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    if let Err(err) = auth.authenticate(&headers) {
        return auth_error_response(err);
    }
    let trace_id = Uuid::now_v7();
    let forced_platform = uri
        .path()
        .trim_start_matches('/')
        .split('/')
        .next()
        .and_then(gate_common::Platform::parse);
    let data = crate::catalog::list_models(forced_platform);
    let body = serde_json::json!({"object": "list", "data": data});
    json_response(
        200,
        Bytes::from(serde_json::to_vec(&body).unwrap_or_default()),
        &trace_id,
    )
}

/// `.../messages/count_tokens`: a non-forwarded estimate, per the external
/// interfaces spec — this never touches an upstream account.
pub async fn count_tokens_handler(
    State(auth): State<Arc<dyn crate::auth::AuthProvider>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(err) = auth.authenticate(&headers) {
        return auth_error_response(err);
    }
    let trace_id = Uuid::now_v7();
    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => {
            return error_response(ProxyError::bad_request("request body is not valid json"));
        }
    };
    let input_tokens = crate::catalog::estimate_tokens(&value);
    let resp_body = serde_json::json!({"input_tokens": input_tokens});
    json_response(
        200,
        Bytes::from(serde_json::to_vec(&resp_body).unwrap_or_default()),
        &trace_id,
    )
}

fn json_response(status: u16, body: Bytes, trace_id: &Uuid) -> Response {
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() =
        http::StatusCode::from_u16(status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
    resp.headers_mut()
        .insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    tag_trace_id(&mut resp, trace_id);
    resp
}

fn stream_response(
    status: u16,
    body: Box<dyn futures_util::Stream<Item = Result<Bytes, std::io::Error>> + Send + Unpin>,
    trace_id: &Uuid,
) -> Response {
    let mut resp = Response::new(Body::from_stream(body));
    *resp.status_mut() =
        http::StatusCode::from_u16(status).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
    resp.headers_mut()
        .insert(http::header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    tag_trace_id(&mut resp, trace_id);
    resp
}

fn tag_trace_id(resp: &mut Response, trace_id: &Uuid) {
    if let Ok(value) = HeaderValue::from_str(&trace_id.to_string()) {
        resp.headers_mut().insert("x-llmgate-request-id", value);
    }
}

fn error_response(err: ProxyError) -> Response {
    let mut resp = Response::new(Body::from(err.body));
    *resp.status_mut() = err.status;
    resp.headers_mut()
        .insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    resp
}

fn auth_error_response(err: AuthError) -> Response {
    let mut resp = Response::new(Body::from(err.body));
    *resp.status_mut() = err.status;
    resp.headers_mut().extend(err.headers);
    resp
}
