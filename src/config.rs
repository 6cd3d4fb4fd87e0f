// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Process configuration.
//!
//! All knobs are CLI flags with sensible in-cluster defaults; log level and
//! format additionally respect `RUST_LOG` / `RUST_LOG_FORMAT` so the container
//! can be tuned without a restart of the argument list.

use clap::Parser;

/// Command-line settings for the authgate controller.
#[derive(Parser, Debug, Clone)]
#[command(name = "authgate", version, about = "Authorizator operator and management proxy")]
pub struct Settings {
    /// Cluster DNS domain used to build in-cluster service URLs
    #[arg(long, default_value = "cluster.local")]
    pub cluster_domain: String,

    /// Bind address for the management proxy
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub proxy_addr: String,

    /// Disable the management proxy surface entirely
    #[arg(long, default_value_t = false)]
    pub disable_proxy: bool,

    /// Bind address for the Prometheus metrics endpoint
    #[arg(long, default_value = "0.0.0.0:9090")]
    pub metrics_addr: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cluster_domain: "cluster.local".to_string(),
            proxy_addr: "0.0.0.0:8080".to_string(),
            disable_proxy: false,
            metrics_addr: "0.0.0.0:9090".to_string(),
        }
    }
}
