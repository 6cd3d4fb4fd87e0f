// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Replica directory: live pod addresses for an authorizator workload.
//!
//! Resolution goes through the managed Service's selector rather than the
//! deterministic label directly, so the directory keeps working even if the
//! Service was edited to point somewhere else. Pods without an assigned IP
//! (still scheduling) are skipped; an empty set is a valid answer.

use async_trait::async_trait;
use tracing::debug;

use crate::adapter::ResourceAdapter;
use crate::constants::MANAGEMENT_PORT;
use crate::errors::AuthgateError;
use crate::naming;

/// Resolves `host:port` management addresses for an authorizator's replicas.
///
/// A trait so the scatter-gather layer can be exercised against fixed
/// addresses in tests.
#[async_trait]
pub trait ReplicaResolver: Send + Sync {
    async fn replica_addresses(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<String>, AuthgateError>;
}

/// Directory backed by the cluster: Service selector -> pod list -> pod IPs.
pub struct ServiceReplicaDirectory {
    adapter: ResourceAdapter,
}

impl ServiceReplicaDirectory {
    #[must_use]
    pub fn new(adapter: ResourceAdapter) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl ReplicaResolver for ServiceReplicaDirectory {
    async fn replica_addresses(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<String>, AuthgateError> {
        let service_name = naming::service_name(name);
        let service = self
            .adapter
            .get_service(namespace, &service_name)
            .await
            .map_err(|e| AuthgateError::ReplicaLookup {
                namespace: namespace.to_string(),
                name: name.to_string(),
                reason: format!("service '{service_name}' lookup failed: {e}"),
            })?;

        let selector = service
            .spec
            .and_then(|s| s.selector)
            .ok_or_else(|| AuthgateError::ReplicaLookup {
                namespace: namespace.to_string(),
                name: name.to_string(),
                reason: format!("service '{service_name}' has no selector"),
            })?;

        let selector_string = selector
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");

        let pods = self
            .adapter
            .list_pods(namespace, &selector_string)
            .await
            .map_err(|e| AuthgateError::ReplicaLookup {
                namespace: namespace.to_string(),
                name: name.to_string(),
                reason: format!("pod list failed: {e}"),
            })?;

        let addresses: Vec<String> = pods
            .into_iter()
            .filter_map(|pod| pod.status.and_then(|s| s.pod_ip))
            .map(|ip| format!("{ip}:{MANAGEMENT_PORT}"))
            .collect();

        debug!(
            namespace,
            name,
            replicas = addresses.len(),
            "Resolved replica addresses"
        );

        Ok(addresses)
    }
}
