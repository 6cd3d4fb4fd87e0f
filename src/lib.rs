// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! # Authgate - Edge Authorization Operator for Kubernetes
//!
//! Authgate is a Kubernetes operator that turns `Authorizator` custom
//! resources into running edge-authorization workloads and wires the
//! referenced Ingress to them, so the ingress controller consults the
//! workload before letting requests through.
//!
//! ## Overview
//!
//! For every Authorizator the operator manages a deterministic resource set:
//! a Deployment running the listener image, a ClusterIP Service in front of
//! it, a ServiceAccount/Role/RoleBinding bundle, and (for Traefik) a
//! forwardAuth Middleware. A separate management proxy fans administrative
//! calls out to every live replica and reduces the answers field-by-field.
//!
//! ## Modules
//!
//! - [`crd`] - The Authorizator custom resource definition
//! - [`watch`] - Raw watch loop translating cluster events into workflows
//! - [`reconciler`] - Add/Modify/Delete workflows with per-identity ordering
//! - [`resources`] - Pure builders for the managed resource set
//! - [`providers`] - Ingress annotation strategies per controller flavor
//! - [`adapter`] - Typed wrappers over the Kubernetes API
//! - [`proxy`] - Scatter-gather management proxy
//! - [`metrics`] - Prometheus metrics and the `/metrics` endpoint
//!
//! ## Example
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

pub mod adapter;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod metrics;
pub mod naming;
pub mod providers;
pub mod proxy;
pub mod reconciler;
pub mod resources;
pub mod watch;

#[cfg(test)]
mod providers_tests;
#[cfg(test)]
mod resources_tests;
