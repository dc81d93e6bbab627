// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The transport seam of the peer list.

use crate::{
    error::Error,
    peer::{Peer, PeerId},
};

use std::sync::Arc;

/// Receives connection status change notifications from a dialer.
///
/// The peer list registers one subscriber per retained peer. A notification
/// carries no payload; the receiver re-reads the peer's status itself.
pub trait StatusSubscriber: Send + Sync {
    /// Informs the subscriber that the connection status of the peer it was
    /// registered for may have changed.
    fn notify_status_changed(&self);
}

/// Hands out reference-counted peers and reports their connection status.
///
/// A dialer owns the actual connections. The peer list never performs I/O of
/// its own; it retains a peer once per admitted identifier and releases it
/// exactly once when the identifier is removed or the list stops.
///
/// Contract: `retain_peer` must not invoke the subscriber before returning,
/// and the dialer must not invoke it anymore once the matching `release_peer`
/// call has returned.
pub trait Dialer: Send + Sync + 'static {
    /// Increments the dialer-side reference count for `id` and registers
    /// `subscriber` for status change notifications. Returns the peer handle.
    fn retain_peer(&self, id: &PeerId, subscriber: Arc<dyn StatusSubscriber>)
        -> Result<Arc<dyn Peer>, Error>;

    /// Decrements the dialer-side reference count for `id` and unregisters
    /// `subscriber`.
    fn release_peer(&self, id: &PeerId, subscriber: Arc<dyn StatusSubscriber>) -> Result<(), Error>;
}
