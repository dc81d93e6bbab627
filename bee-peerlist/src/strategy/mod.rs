// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Pluggable peer-selection strategies.

pub mod fewest_pending;
pub mod random;
pub mod round_robin;
pub mod two_random_choices;

pub use fewest_pending::FewestPending;
pub use random::Random;
pub use round_robin::RoundRobin;
pub use two_random_choices::TwoRandomChoices;

use crate::{
    context::Request,
    peer::{Peer, PeerId},
};

use std::sync::Arc;

/// A peer-selection algorithm operating on the currently available peers.
///
/// Every method is invoked with the owning list's lock held, so
/// implementations need no synchronization of their own, and none of the
/// methods may block.
pub trait Strategy: Send + 'static {
    /// The handle returned from [`add`](Strategy::add), through which
    /// pending-request-count updates for that peer are delivered later.
    type Subscriber: Send + Sync + 'static;

    /// Inserts an available peer.
    fn add(&mut self, peer: Arc<dyn Peer>, id: &PeerId) -> Self::Subscriber;

    /// Removes the peer identified by `subscriber`.
    ///
    /// Only called while the peer is present. Once this returns, the handle
    /// is stale and later [`update_pending`](Strategy::update_pending) calls
    /// for it must be ignored.
    fn remove(&mut self, id: &PeerId, subscriber: &Self::Subscriber);

    /// Returns one peer without removing it, or `None` if no peer is
    /// available.
    fn choose(&mut self, request: &Request) -> Option<Arc<dyn Peer>>;

    /// Records a new pending-request count for the peer behind `subscriber`.
    fn update_pending(&mut self, subscriber: &Self::Subscriber, pending: usize);
}
