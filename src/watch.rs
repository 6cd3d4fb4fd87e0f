// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Event source: a raw watch over all Authorizators.
//!
//! The raw watch (rather than a reflector/controller runtime) is deliberate:
//! the workflows distinguish Added from Modified, and arrival order matters.
//! The loop tracks `resourceVersion` across reconnects and resyncs from "0"
//! when the API server reports the version as expired (410). Events are
//! handed to the reconciler, which runs them on spawned tasks; the transport
//! itself never blocks on a workflow.

use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use kube::api::{WatchEvent, WatchParams};
use kube::{Api, ResourceExt};
use tracing::{debug, error, info, warn};

use crate::constants::WATCH_RETRY_DELAY_SECS;
use crate::context::Context;
use crate::crd::Authorizator;
use crate::reconciler::{AuthorizatorEvent, Reconciler};

/// Run the watch loop forever. Only returns on a non-recoverable setup
/// failure; transient stream errors re-establish the watch after a delay.
pub async fn run_watch(ctx: Arc<Context>, reconciler: Arc<Reconciler>) -> anyhow::Result<()> {
    let api: Api<Authorizator> = Api::all(ctx.adapter.client().clone());
    let mut version = "0".to_string();

    loop {
        info!(%version, "Establishing authorizator watch");

        let stream = match api.watch(&WatchParams::default(), &version).await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Failed to establish watch, retrying");
                tokio::time::sleep(Duration::from_secs(WATCH_RETRY_DELAY_SECS)).await;
                continue;
            }
        };
        let mut stream = stream.boxed();

        loop {
            match stream.try_next().await {
                Ok(Some(WatchEvent::Added(az))) => {
                    if let Some(v) = az.resource_version() {
                        version = v;
                    }
                    debug!(name = %az.name_any(), "Watch event: added");
                    reconciler.dispatch(AuthorizatorEvent::Added(Box::new(az)));
                }
                Ok(Some(WatchEvent::Modified(az))) => {
                    if let Some(v) = az.resource_version() {
                        version = v;
                    }
                    debug!(name = %az.name_any(), "Watch event: modified");
                    reconciler.dispatch(AuthorizatorEvent::Modified(Box::new(az)));
                }
                Ok(Some(WatchEvent::Deleted(az))) => {
                    if let Some(v) = az.resource_version() {
                        version = v;
                    }
                    debug!(name = %az.name_any(), "Watch event: deleted");
                    reconciler.dispatch(AuthorizatorEvent::Deleted(Box::new(az)));
                }
                Ok(Some(WatchEvent::Bookmark(bookmark))) => {
                    version = bookmark.metadata.resource_version;
                }
                Ok(Some(WatchEvent::Error(status))) => {
                    error!(code = status.code, message = %status.message, "Watch stream error");
                    if status.code == 410 {
                        // Our resourceVersion expired; resync from scratch.
                        version = "0".to_string();
                        break;
                    }
                }
                Ok(None) => {
                    debug!("Watch stream ended, re-establishing");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Watch stream failed, re-establishing");
                    break;
                }
            }
        }

        tokio::time::sleep(Duration::from_secs(WATCH_RETRY_DELAY_SECS)).await;
    }
}
