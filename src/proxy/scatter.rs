// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Concurrent fan-out of management calls over replica addresses.
//!
//! Every replica gets the same request. Calls run concurrently with bounded
//! parallelism and a per-call timeout; responses are collected in replica
//! order so the reducer's order-sensitive operators (`array`, `merge`,
//! tie-breaks) see a stable sequence. With a reducer spec a failed replica is
//! dropped from the aggregate; without one any failure propagates to the
//! caller, as it does in single-target mode.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::{FAN_OUT_CONCURRENCY, REPLICA_CALL_TIMEOUT_SECS};
use crate::errors::AuthgateError;
use crate::metrics;
use crate::proxy::reducer::{reduce, ReducerSpec};

/// Wire verb for a management call. PUT requests from management tooling are
/// forwarded as POST; the listener's management API only distinguishes reads
/// from writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
}

/// Shared HTTP client for replica calls.
#[derive(Clone)]
pub struct ScatterGather {
    http: reqwest::Client,
}

impl ScatterGather {
    /// Build the shared client with the per-call timeout baked in.
    ///
    /// # Errors
    /// Returns error if the TLS backend cannot initialize.
    pub fn new() -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REPLICA_CALL_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http })
    }

    /// One call against one URL. `text/*` responses become an empty JSON
    /// object; everything else must parse as JSON.
    async fn call_one(&self, url: &str, verb: Verb, body: Option<&Value>) -> anyhow::Result<Value> {
        let request = match verb {
            Verb::Get => self.http.get(url),
            Verb::Post => {
                let r = self.http.post(url);
                match body {
                    Some(b) => r.json(b),
                    None => r,
                }
            }
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("{url} answered {status}");
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.starts_with("text/") {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        Ok(response.json().await?)
    }

    /// Call every replica address.
    ///
    /// With a reducer spec, failed replicas are dropped and the survivors
    /// reduced. Without one, any replica failure propagates; otherwise the
    /// first response is returned raw (empty object when there are no
    /// replicas).
    pub async fn fan_out(
        &self,
        addresses: &[String],
        path: &str,
        verb: Verb,
        body: Option<&Value>,
        reducer: Option<&ReducerSpec>,
    ) -> Result<Value, AuthgateError> {
        // Addresses are iterated owned so the per-call futures borrow nothing
        // from the closure argument.
        let results: Vec<Result<Value, AuthgateError>> = stream::iter(addresses.to_vec())
            .map(|address| async move {
                let url = format!("http://{address}{path}");
                match self.call_one(&url, verb, body).await {
                    Ok(value) => {
                        metrics::record_replica_call(true);
                        Ok(value)
                    }
                    Err(e) => {
                        metrics::record_replica_call(false);
                        Err(AuthgateError::ReplicaCall {
                            url,
                            reason: e.to_string(),
                        })
                    }
                }
            })
            .buffered(FAN_OUT_CONCURRENCY)
            .collect()
            .await;

        let answered = results.iter().filter(|r| r.is_ok()).count();
        debug!(path, replicas = addresses.len(), answered, "Fan-out complete");

        match reducer {
            Some(spec) => {
                let collected: Vec<Value> = results
                    .into_iter()
                    .filter_map(|result| match result {
                        Ok(value) => Some(value),
                        Err(e) => {
                            warn!(error = %e, "Replica call failed, dropping from aggregate");
                            None
                        }
                    })
                    .collect();
                Ok(reduce(spec, &collected))
            }
            None => {
                let mut collected = Vec::with_capacity(results.len());
                for result in results {
                    collected.push(result?);
                }
                Ok(collected
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| Value::Object(serde_json::Map::new())))
            }
        }
    }

    /// One call against one URL; any failure propagates.
    pub async fn single(
        &self,
        url: &str,
        verb: Verb,
        body: Option<&Value>,
    ) -> Result<Value, AuthgateError> {
        match self.call_one(url, verb, body).await {
            Ok(value) => {
                metrics::record_replica_call(true);
                Ok(value)
            }
            Err(e) => {
                metrics::record_replica_call(false);
                Err(AuthgateError::ReplicaCall {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
