// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for edge authorization.
//!
//! This module defines the `Authorizator` custom resource: a declarative request
//! for an edge-authorization workload bound to one Ingress. The controller turns
//! each Authorizator into a managed set of namespaced objects (Deployment,
//! Service, ServiceAccount, Role, RoleBinding and, for Traefik, a Middleware)
//! and wires the referenced Ingress to the workload's validation endpoint.
//!
//! # Example: Creating an Authorizator
//!
//! ```rust,no_run
//! use authgate::crd::{AuthorizatorSpec, AuthorizatorConfig, IngressRef, IngressProvider};
//!
//! let spec = AuthorizatorSpec {
//!     ingress: IngressRef {
//!         name: "shop-front".to_string(),
//!         class: Some("nginx".to_string()),
//!         provider: IngressProvider::IngressNginx,
//!     },
//!     rulesets: serde_json::json!([{ "uri": "/", "uritype": "prefix" }]),
//!     validators: serde_json::json!([]),
//!     config: AuthorizatorConfig::default(),
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for an edge-authorization workload bound to one Ingress.
///
/// `rulesets` and `validators` are opaque to the controller: they are encoded
/// verbatim into the workload environment and interpreted by the listener
/// image only.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, JsonSchema)]
#[kube(
    group = "authgate.dev",
    version = "v1alpha1",
    kind = "Authorizator",
    plural = "authorizators",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizatorSpec {
    /// The Ingress this authorizator guards
    pub ingress: IngressRef,

    /// Route protection rules, passed through to the listener untouched
    #[serde(default)]
    pub rulesets: serde_json::Value,

    /// Token validator definitions, passed through to the listener untouched
    #[serde(default)]
    pub validators: serde_json::Value,

    /// Workload tuning
    #[serde(default)]
    pub config: AuthorizatorConfig,
}

/// Reference to the Ingress the authorizator guards.
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressRef {
    /// Ingress object name (same namespace as the Authorizator)
    pub name: String,

    /// Ingress class name, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,

    /// Ingress controller flavor; selects the annotation strategy
    #[serde(default)]
    pub provider: IngressProvider,
}

/// Closed set of supported ingress controller flavors.
///
/// Unknown spellings deserialize to [`IngressProvider::Invalid`] rather than
/// failing the whole object, so a typo in one Authorizator cannot wedge the
/// event stream.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IngressProvider {
    /// kubernetes/ingress-nginx (community controller)
    IngressNginx,
    /// nginxinc/nginx-ingress (nginx.org controller)
    NginxIngress,
    /// Traefik, wired through a forwardAuth Middleware CRD
    Traefik,
    /// HAProxy, recognized but not yet supported
    Haproxy,
    /// Anything else
    #[serde(other)]
    #[default]
    Invalid,
}

impl std::fmt::Display for IngressProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::IngressNginx => "ingress-nginx",
            Self::NginxIngress => "nginx-ingress",
            Self::Traefik => "traefik",
            Self::Haproxy => "haproxy",
            Self::Invalid => "invalid",
        };
        f.write_str(s)
    }
}

/// Workload tuning knobs, all passed to the listener environment.
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizatorConfig {
    /// Desired listener replica count
    #[serde(default = "default_replicas")]
    pub replicas: i32,

    /// Whether the listener exposes its own prometheus endpoint
    #[serde(default)]
    pub prometheus: bool,

    /// Whether the listener serves its management API
    #[serde(default = "default_api")]
    pub api: bool,

    /// Listener log verbosity (listener-defined scale)
    #[serde(default)]
    pub log_level: i32,
}

impl Default for AuthorizatorConfig {
    fn default() -> Self {
        Self {
            replicas: default_replicas(),
            prometheus: false,
            api: default_api(),
            log_level: 0,
        }
    }
}

fn default_replicas() -> i32 {
    1
}

fn default_api() -> bool {
    true
}

impl Authorizator {
    /// Namespace of this authorizator, falling back to `"default"`.
    ///
    /// The fallback mirrors the API server's own defaulting for namespaced
    /// objects submitted without a namespace.
    #[must_use]
    pub fn namespace_or_default(&self) -> String {
        self.metadata
            .namespace
            .clone()
            .unwrap_or_else(|| crate::constants::FALLBACK_NAMESPACE.to_string())
    }
}
