// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Peer identifiers.

use serde::{Deserialize, Serialize};

use std::fmt;

/// Uniquely identifies a remote endpoint within the namespace of its dialer.
///
/// Identifiers are opaque to the peer list. A typical TCP dialer uses a
/// `host:port` string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    /// Creates a peer id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
