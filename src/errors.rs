// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Error types for reconciliation and the management proxy.
//!
//! Reconciliation steps are best-effort: most failures are logged and the
//! workflow moves on. The types here cover the two places where a failure
//! changes control flow instead - event rejection during validation, and
//! HTTP error reporting on the proxy surface.

use thiserror::Error;

/// Errors that reject an event or surface on the proxy.
#[derive(Error, Debug)]
pub enum AuthgateError {
    /// The event references an Ingress that does not exist.
    ///
    /// Add and Modify workflows reject the whole event on this error; no
    /// managed objects are touched.
    #[error("Ingress '{ingress}' not found in namespace '{namespace}'")]
    IngressNotFound {
        /// The ingress name from the authorizator spec
        ingress: String,
        /// The authorizator's namespace
        namespace: String,
    },

    /// The event could not be validated for a reason other than a missing
    /// Ingress (API connectivity, permissions).
    #[error("Validation of '{namespace}/{name}' failed: {source}")]
    ValidationFailed {
        /// The authorizator's namespace
        namespace: String,
        /// The authorizator name
        name: String,
        /// Underlying API error
        #[source]
        source: kube::Error,
    },

    /// A replica directory lookup failed (service missing, pod list error).
    #[error("Replica lookup for '{namespace}/{name}' failed: {reason}")]
    ReplicaLookup {
        /// The authorizator's namespace
        namespace: String,
        /// The authorizator name
        name: String,
        /// What went wrong
        reason: String,
    },

    /// A replica call failed in single-target mode, where there is no
    /// aggregate to drop it from.
    #[error("Replica call to {url} failed: {reason}")]
    ReplicaCall {
        /// The replica URL that failed
        url: String,
        /// What went wrong
        reason: String,
    },
}

/// Whether a kube API error is a plain 404.
///
/// Used to tell "the object is gone" (benign during Delete, fatal during
/// Add/Modify validation) apart from transport or permission failures.
#[must_use]
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// Whether a kube API error is a 409 conflict.
#[must_use]
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}
