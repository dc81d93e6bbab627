// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Call-scoped data passed to `choose`.

use tokio::time::Instant;

use std::time::Duration;

/// Deadline information for a single `choose` call.
///
/// A context without a deadline is only accepted by lists configured with a
/// default choose timeout.
#[derive(Clone, Copy, Debug, Default)]
pub struct Context {
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a context without a deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Creates a context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Returns the deadline, if one is set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Metadata describing the request a peer is being chosen for.
///
/// The built-in strategies select purely on availability and load; custom
/// strategies may route on this metadata instead.
#[derive(Clone, Debug, Default)]
pub struct Request {
    /// The name of the calling service.
    pub caller: String,
    /// The name of the destination service.
    pub service: String,
    /// An optional routing key for sharded destinations.
    pub shard_key: Option<String>,
}
