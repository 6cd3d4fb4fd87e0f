// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Global constants for the authgate operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the Authorizator CRD
pub const API_GROUP: &str = "authgate.dev";

/// API version for the Authorizator CRD
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "authgate.dev/v1alpha1";

/// Kind name for the `Authorizator` resource
pub const KIND_AUTHORIZATOR: &str = "Authorizator";

/// Plural resource name for the `Authorizator` CRD
pub const PLURAL_AUTHORIZATORS: &str = "authorizators";

/// Namespace assumed when an Authorizator carries no namespace of its own
pub const FALLBACK_NAMESPACE: &str = "default";

// ============================================================================
// Managed Workload Constants
// ============================================================================

/// Container image run by every managed listener workload
pub const LISTENER_IMAGE: &str = "authgate/listener:latest";

/// Port the listener answers `/validate/{name}` checks on
pub const VALIDATE_PORT: i32 = 3000;

/// Port the listener serves its management API on
pub const MANAGEMENT_PORT: i32 = 3882;

// ============================================================================
// Workload Back-Reference Annotations
// ============================================================================
// Written onto the managed Deployment's pod template; the delete workflow
// reads the annotated ingress name back from here instead of keeping a
// separate index.

/// Pod template annotation holding the annotated ingress name
pub const ANNOTATION_INGRESS: &str = "authgate.dev/ingress";

/// Pod template annotation holding the owning authorizator name
pub const ANNOTATION_AUTHORIZATOR: &str = "authgate.dev/authorizator";

/// Pod template annotation holding the owning authorizator namespace
pub const ANNOTATION_NAMESPACE: &str = "authgate.dev/namespace";

// ============================================================================
// Ingress Provider Annotation Keys
// ============================================================================

/// ingress-nginx: external auth URL
pub const NGINX_INGRESS_AUTH_URL: &str = "nginx.ingress.kubernetes.io/auth-url";

/// ingress-nginx: HTTP method used for the auth sub-request
pub const NGINX_INGRESS_AUTH_METHOD: &str = "nginx.ingress.kubernetes.io/auth-method";

/// ingress-nginx: headers copied from the auth response onto the upstream request
pub const NGINX_INGRESS_AUTH_RESPONSE_HEADERS: &str =
    "nginx.ingress.kubernetes.io/auth-response-headers";

/// nginx-ingress (nginx.org): per-location snippet block
pub const NGINX_ORG_LOCATION_SNIPPETS: &str = "nginx.org/location-snippets";

/// nginx-ingress (nginx.org): per-server snippet block
pub const NGINX_ORG_SERVER_SNIPPETS: &str = "nginx.org/server-snippets";

/// traefik: router middleware reference annotation
pub const TRAEFIK_ROUTER_MIDDLEWARES: &str = "traefik.ingress.kubernetes.io/router.middlewares";

/// API group of the Traefik Middleware CRD
pub const TRAEFIK_API_GROUP: &str = "traefik.io";

/// API version of the Traefik Middleware CRD
pub const TRAEFIK_API_VERSION: &str = "v1alpha1";

/// Kind of the Traefik Middleware CRD
pub const TRAEFIK_KIND_MIDDLEWARE: &str = "Middleware";

/// Plural resource name of the Traefik Middleware CRD
pub const TRAEFIK_PLURAL_MIDDLEWARES: &str = "middlewares";

// ============================================================================
// Scatter-Gather Constants
// ============================================================================

/// Upper bound on in-flight replica calls during a fan-out
pub const FAN_OUT_CONCURRENCY: usize = 8;

/// Per-replica HTTP call timeout in seconds
pub const REPLICA_CALL_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Event Source Constants
// ============================================================================

/// Delay before re-establishing a failed watch, in seconds
pub const WATCH_RETRY_DELAY_SECS: u64 = 5;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Field manager name used for write operations against the API server
pub const FIELD_MANAGER: &str = "authgate-controller";
