// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Peer list configuration.

use serde::{Deserialize, Serialize};

use std::time::Duration;

#[rustfmt::skip]
// # Example
// ```json
// "peerList": {
//     "capacity": 16,
//     "shuffle": true,
//     "failFast": false,
//     "defaultChooseTimeoutMs": 500
// }
// ```

/// Configuration for a [`PeerList`](crate::PeerList).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename = "peerList")]
pub struct PeerListConfig {
    /// A hint for the number of peers the list is expected to retain.
    #[serde(rename = "capacity", default)]
    pub capacity: Option<usize>,
    /// Whether batches of added peers are shuffled before insertion, so that
    /// many clients receiving the same update do not dogpile one peer.
    #[serde(rename = "shuffle", default = "default_shuffle")]
    pub shuffle: bool,
    /// Whether `choose` fails immediately when no peer is available instead
    /// of waiting for one.
    #[serde(rename = "failFast", default)]
    pub fail_fast: bool,
    /// Seed for the shuffle RNG. Randomly seeded when unset.
    #[serde(rename = "seed", default)]
    pub seed: Option<u64>,
    /// Timeout in milliseconds applied to `choose` calls that carry no
    /// deadline of their own.
    #[serde(rename = "defaultChooseTimeoutMs", default)]
    pub default_choose_timeout_ms: Option<u64>,
}

impl PeerListConfig {
    /// Returns the default choose timeout as a [`Duration`].
    pub fn default_choose_timeout(&self) -> Option<Duration> {
        self.default_choose_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for PeerListConfig {
    fn default() -> Self {
        Self {
            capacity: None,
            shuffle: true,
            fail_fast: false,
            seed: None,
            default_choose_timeout_ms: None,
        }
    }
}

fn default_shuffle() -> bool {
    true
}
