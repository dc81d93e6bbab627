// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Peer abstractions shared between the list, its dialer and its strategies.

pub mod peer_id;

pub use peer_id::PeerId;

use serde::{Deserialize, Serialize};

use std::fmt;

/// The connection state of a peer as reported by its dialer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    /// The dialer is trying to establish a connection.
    Connecting,
    /// At least one healthy connection is established.
    Available,
    /// No healthy connection exists.
    Unavailable,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        ConnectionStatus::Unavailable
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Available => write!(f, "available"),
            ConnectionStatus::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A snapshot of a peer's connection state and outstanding request count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PeerStatus {
    /// The connection state reported by the dialer.
    pub connection: ConnectionStatus,
    /// The number of requests handed out for this peer whose finisher has not
    /// run yet. Maintained by the list, not the dialer.
    pub pending_requests: usize,
}

/// A remote endpoint produced by a dialer.
pub trait Peer: Send + Sync {
    /// Returns the identifier of this peer.
    fn identifier(&self) -> &PeerId;

    /// Returns the current status of this peer.
    fn status(&self) -> PeerStatus;
}
