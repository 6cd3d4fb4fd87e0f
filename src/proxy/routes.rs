// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! HTTP surface of the management proxy.
//!
//! `/proxy/{namespace}/{name}/{*rest}` forwards management calls to the
//! authorizator's replicas. A fixed table decides per path and verb whether
//! the call fans out over every replica (with which reducer) or goes to a
//! single target through the Service's stable DNS name.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::metrics;
use crate::naming;
use crate::proxy::directory::ReplicaResolver;
use crate::proxy::reducer::{Operator, ReducerSpec};
use crate::proxy::scatter::{ScatterGather, Verb};

/// How one management call is routed.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutePlan {
    /// Every replica, responses reduced (or first response when no spec).
    FanOut(Option<ReducerSpec>),
    /// One call through the Service DNS name.
    Single,
}

/// Routing table for GET calls.
///
/// Only the status overview aggregates counters across replicas; every other
/// read is replica-independent configuration and goes to a single target.
#[must_use]
pub fn plan_get(path: &str) -> RoutePlan {
    match path {
        "/api/overview/status" => RoutePlan::FanOut(Some(ReducerSpec::from_rules(&[
            ("totalRequests", "totalRequests", Operator::Sum),
            ("totalMicros", "totalMicros", Operator::Sum),
        ]))),
        _ => RoutePlan::Single,
    }
}

/// Routing table for POST calls.
///
/// Trace sessions live on every replica, so trace control fans out; cache
/// invalidation by key fans out without reduction (any replica's answer
/// will do); everything else is a single-target write.
#[must_use]
pub fn plan_post(path: &str) -> RoutePlan {
    match path {
        "/api/trace/subject" => RoutePlan::FanOut(Some(ReducerSpec::from_rules(&[
            ("ok", "ok", Operator::And),
            ("okDetail", "ok", Operator::Array),
            ("id", "id", Operator::Min),
        ]))),
        "/api/trace/events" => RoutePlan::FanOut(Some(ReducerSpec::from_rules(&[
            ("ok", "ok", Operator::And),
            ("okDetail", "ok", Operator::Array),
            ("events", "events", Operator::Merge),
        ]))),
        "/api/trace/stop" => RoutePlan::FanOut(Some(ReducerSpec::from_rules(&[
            ("ok", "ok", Operator::And),
            ("okDetail", "ok", Operator::Array),
        ]))),
        "/api/invalidate/sub" | "/api/invalidate/iss" | "/api/invalidate/aud"
        | "/api/invalidate/claim" => RoutePlan::FanOut(None),
        _ => RoutePlan::Single,
    }
}

/// Shared state for the proxy handlers.
pub struct ProxyState {
    pub resolver: Arc<dyn ReplicaResolver>,
    pub scatter: ScatterGather,
    pub cluster_domain: String,
}

/// Build the proxy router.
pub fn router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .route(
            "/proxy/{namespace}/{name}/{*rest}",
            get(handle_get).put(handle_put).post(handle_post),
        )
        .with_state(state)
}

/// Serve the proxy until the process exits.
///
/// # Errors
/// Returns error if the listener cannot bind.
pub async fn serve_proxy(state: Arc<ProxyState>, addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "Management proxy listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle_get(
    State(state): State<Arc<ProxyState>>,
    Path((namespace, name, rest)): Path<(String, String, String)>,
) -> Response {
    let path = format!("/{rest}");
    dispatch(&state, &namespace, &name, &path, "get", Verb::Get, None, plan_get(&path)).await
}

async fn handle_put(
    State(state): State<Arc<ProxyState>>,
    Path((namespace, name, rest)): Path<(String, String, String)>,
    body: Bytes,
) -> Response {
    let path = format!("/{rest}");
    let body = match parse_body(&body) {
        Ok(b) => b,
        Err(response) => return response,
    };
    // Writes always go to one replica; replication is the workload's problem.
    dispatch(
        &state,
        &namespace,
        &name,
        &path,
        "put",
        Verb::Post,
        body,
        RoutePlan::Single,
    )
    .await
}

async fn handle_post(
    State(state): State<Arc<ProxyState>>,
    Path((namespace, name, rest)): Path<(String, String, String)>,
    body: Bytes,
) -> Response {
    let path = format!("/{rest}");
    let body = match parse_body(&body) {
        Ok(b) => b,
        Err(response) => return response,
    };
    dispatch(
        &state,
        &namespace,
        &name,
        &path,
        "post",
        Verb::Post,
        body,
        plan_post(&path),
    )
    .await
}

/// Empty bodies are allowed (trace stop, invalidation); anything present must
/// be JSON.
fn parse_body(bytes: &Bytes) -> Result<Option<Value>, Response> {
    if bytes.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(bytes).map(Some).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "ok": false, "error": format!("invalid JSON body: {e}") })),
        )
            .into_response()
    })
}

#[allow(clippy::too_many_arguments)]
async fn dispatch(
    state: &ProxyState,
    namespace: &str,
    name: &str,
    path: &str,
    verb_label: &str,
    verb: Verb,
    body: Option<Value>,
    plan: RoutePlan,
) -> Response {
    debug!(namespace, name, path, verb = verb_label, ?plan, "Proxy dispatch");

    match plan {
        RoutePlan::FanOut(reducer) => {
            let addresses = match state.resolver.replica_addresses(namespace, name).await {
                Ok(a) => a,
                Err(e) => {
                    warn!(namespace, name, error = %e, "Replica resolution failed");
                    metrics::record_proxy_request(verb_label, true, false);
                    return error_response(&e.to_string());
                }
            };

            match state
                .scatter
                .fan_out(&addresses, path, verb, body.as_ref(), reducer.as_ref())
                .await
            {
                Ok(result) => {
                    metrics::record_proxy_request(verb_label, true, true);
                    (StatusCode::OK, Json(result)).into_response()
                }
                Err(e) => {
                    warn!(namespace, name, path, error = %e, "Fan-out failed");
                    metrics::record_proxy_request(verb_label, true, false);
                    error_response(&e.to_string())
                }
            }
        }
        RoutePlan::Single => {
            let url = format!(
                "{base}{path}",
                base = naming::management_base_url(namespace, name, &state.cluster_domain)
            );
            match state.scatter.single(&url, verb, body.as_ref()).await {
                Ok(result) => {
                    metrics::record_proxy_request(verb_label, false, true);
                    (StatusCode::OK, Json(result)).into_response()
                }
                Err(e) => {
                    warn!(namespace, name, path, error = %e, "Single-target call failed");
                    metrics::record_proxy_request(verb_label, false, false);
                    error_response(&e.to_string())
                }
            }
        }
    }
}

fn error_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "ok": false, "error": message })),
    )
        .into_response()
}
