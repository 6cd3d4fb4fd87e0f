// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Deterministic names for the managed resource set.
//!
//! Every object the controller owns is named from the authorizator name alone.
//! The delete workflow recomputes these names instead of consulting stored
//! state, so the templates here are the only linkage between an Authorizator
//! and its managed objects. Changing a template orphans everything created
//! under the old one.

/// Name of the managed Deployment.
#[must_use]
pub fn deployment_name(name: &str) -> String {
    format!("authgate-{name}-deploy")
}

/// Name of the managed Service.
#[must_use]
pub fn service_name(name: &str) -> String {
    format!("authgate-{name}-svc")
}

/// Name of the managed ServiceAccount.
#[must_use]
pub fn service_account_name(name: &str) -> String {
    format!("authgate-{name}-sa")
}

/// Name of the managed Role.
#[must_use]
pub fn role_name(name: &str) -> String {
    format!("authgate-{name}-role")
}

/// Name of the managed RoleBinding.
#[must_use]
pub fn role_binding_name(name: &str) -> String {
    format!("authgate-{name}-rolebinding")
}

/// Name of the Traefik Middleware (traefik provider only).
#[must_use]
pub fn middleware_name(name: &str) -> String {
    format!("authgate-{name}-forwardauth")
}

/// Pod app label value shared by the Deployment selector and the Service.
#[must_use]
pub fn app_label(name: &str) -> String {
    format!("authgate-{name}-listener")
}

/// In-cluster base URL of the workload's validation endpoint.
#[must_use]
pub fn validate_url(namespace: &str, name: &str, cluster_domain: &str) -> String {
    format!(
        "http://{svc}.{namespace}.svc.{cluster_domain}:{port}/validate/{name}",
        svc = service_name(name),
        port = crate::constants::VALIDATE_PORT,
    )
}

/// In-cluster base URL of the workload's management API (no trailing slash).
#[must_use]
pub fn management_base_url(namespace: &str, name: &str, cluster_domain: &str) -> String {
    format!(
        "http://{svc}.{namespace}.svc.{cluster_domain}:{port}",
        svc = service_name(name),
        port = crate::constants::MANAGEMENT_PORT,
    )
}
