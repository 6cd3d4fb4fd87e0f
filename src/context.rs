// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Shared context for the controller and proxy tasks.
//!
//! Everything stateful the workflows need travels in one `Arc<Context>`:
//! Kubernetes access through the adapter and process settings. No module
//! globals; tests construct their own context around fakes where the seams
//! allow it.

use crate::adapter::ResourceAdapter;
use crate::config::Settings;

/// Shared context passed to the reconciler and the proxy.
#[derive(Clone)]
pub struct Context {
    /// Typed cluster access
    pub adapter: ResourceAdapter,

    /// Process configuration
    pub settings: Settings,
}

impl Context {
    #[must_use]
    pub fn new(adapter: ResourceAdapter, settings: Settings) -> Self {
        Self { adapter, settings }
    }
}
