// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Management proxy: scatter-gather over authorizator replicas.
//!
//! The managed workload keeps per-replica state (counters, trace sessions),
//! so management reads have to consult every live replica and merge the
//! answers. This module resolves live replicas through the Service selector,
//! fans requests out with bounded concurrency, reduces the responses
//! field-by-field, and serves the result over HTTP.

pub mod directory;
pub mod reducer;
pub mod routes;
pub mod scatter;

#[cfg(test)]
mod reducer_tests;
