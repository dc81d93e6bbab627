// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The list's per-peer wrapper.

use crate::{
    dialer::StatusSubscriber,
    peer::{ConnectionStatus, Peer, PeerId, PeerStatus},
};

use std::sync::{
    atomic::{AtomicU8, AtomicUsize, Ordering},
    Arc, Mutex, Weak,
};

// The list-side operations a facade calls back into, type-erased so facades
// and finishers stay independent of the list's strategy parameter.
pub(crate) trait ListCore: Send + Sync {
    fn peer_status_changed(&self, id: &PeerId);
    fn request_finished(&self, facade: &Arc<PeerFacade>);
}

const CONNECTING: u8 = 0;
const AVAILABLE: u8 = 1;
const UNAVAILABLE: u8 = 2;

fn encode(status: ConnectionStatus) -> u8 {
    match status {
        ConnectionStatus::Connecting => CONNECTING,
        ConnectionStatus::Available => AVAILABLE,
        ConnectionStatus::Unavailable => UNAVAILABLE,
    }
}

fn decode(status: u8) -> ConnectionStatus {
    match status {
        CONNECTING => ConnectionStatus::Connecting,
        AVAILABLE => ConnectionStatus::Available,
        _ => ConnectionStatus::Unavailable,
    }
}

// Mediates between dialer notifications, the strategy and request tasks for
// one retained peer.
//
// The facade is owned by the list; the dialer and outstanding finishers hold
// extra handles. The back-reference to the list is non-owning, and per the
// dialer contract a facade is never notified after its release has returned.
// All fields are mutated under the list lock; the atomics exist so read-only
// observers stay lock-free.
pub(crate) struct PeerFacade {
    id: PeerId,
    list: Weak<dyn ListCore>,
    peer: Mutex<Option<Arc<dyn Peer>>>,
    connection: AtomicU8,
    pending: AtomicUsize,
}

impl PeerFacade {
    pub(crate) fn new(id: PeerId, list: Weak<dyn ListCore>) -> Self {
        Self {
            id,
            list,
            peer: Mutex::new(None),
            connection: AtomicU8::new(UNAVAILABLE),
            pending: AtomicUsize::new(0),
        }
    }

    pub(crate) fn id(&self) -> &PeerId {
        &self.id
    }

    pub(crate) fn set_peer(&self, peer: Arc<dyn Peer>) {
        *self.peer.lock().expect("error locking peer handle") = Some(peer);
    }

    pub(crate) fn dialer_peer(&self) -> Option<Arc<dyn Peer>> {
        self.peer.lock().expect("error locking peer handle").clone()
    }

    pub(crate) fn connection_status(&self) -> ConnectionStatus {
        decode(self.connection.load(Ordering::Relaxed))
    }

    pub(crate) fn set_connection_status(&self, status: ConnectionStatus) {
        self.connection.store(encode(status), Ordering::Relaxed);
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    // Returns the new count.
    pub(crate) fn increment_pending(&self) -> usize {
        self.pending.fetch_add(1, Ordering::Relaxed) + 1
    }

    // Returns the new count.
    pub(crate) fn decrement_pending(&self) -> usize {
        let previous = self.pending.fetch_sub(1, Ordering::Relaxed);
        debug_assert!(previous > 0, "pending count underflow for peer {}", self.id);
        previous - 1
    }
}

impl Peer for PeerFacade {
    fn identifier(&self) -> &PeerId {
        &self.id
    }

    fn status(&self) -> PeerStatus {
        PeerStatus {
            connection: self.connection_status(),
            pending_requests: self.pending(),
        }
    }
}

impl StatusSubscriber for PeerFacade {
    fn notify_status_changed(&self) {
        if let Some(list) = self.list.upgrade() {
            list.peer_status_changed(&self.id);
        }
    }
}
