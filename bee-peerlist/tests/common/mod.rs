// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Shared helpers for the integration tests.

#![allow(dead_code)]

use bee_peerlist::{
    ConnectionStatus, Context, Dialer, Error, ListUpdates, Peer, PeerId, PeerListConfig, PeerStatus,
    StatusSubscriber,
};

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

/// A peer produced by the [`MockDialer`].
pub struct MockPeer {
    id: PeerId,
    connection: Mutex<ConnectionStatus>,
}

impl Peer for MockPeer {
    fn identifier(&self) -> &PeerId {
        &self.id
    }

    fn status(&self) -> PeerStatus {
        PeerStatus {
            connection: *self.connection.lock().unwrap(),
            pending_requests: 0,
        }
    }
}

struct Registration {
    peer: Arc<MockPeer>,
    subscriber: Arc<dyn StatusSubscriber>,
}

/// An in-memory dialer with scriptable connection statuses.
pub struct MockDialer {
    initial: ConnectionStatus,
    registrations: Mutex<HashMap<PeerId, Registration>>,
    released: Mutex<Vec<PeerId>>,
    failing_retains: Mutex<HashSet<PeerId>>,
}

impl MockDialer {
    pub fn available() -> Arc<Self> {
        Self::with_status(ConnectionStatus::Available)
    }

    pub fn unavailable() -> Arc<Self> {
        Self::with_status(ConnectionStatus::Unavailable)
    }

    pub fn with_status(initial: ConnectionStatus) -> Arc<Self> {
        Arc::new(Self {
            initial,
            registrations: Mutex::new(HashMap::new()),
            released: Mutex::new(Vec::new()),
            failing_retains: Mutex::new(HashSet::new()),
        })
    }

    /// Changes the status of a retained peer and notifies its subscriber.
    pub fn set_status(&self, id: &str, connection: ConnectionStatus) {
        let subscriber = {
            let registrations = self.registrations.lock().unwrap();
            let registration = registrations.get(&PeerId::from(id)).expect("peer not retained");
            *registration.peer.connection.lock().unwrap() = connection;
            registration.subscriber.clone()
        };
        subscriber.notify_status_changed();
    }

    /// Makes the next retain of `id` fail.
    pub fn fail_next_retain(&self, id: &str) {
        self.failing_retains.lock().unwrap().insert(PeerId::from(id));
    }

    pub fn num_retained(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    pub fn released(&self) -> Vec<PeerId> {
        self.released.lock().unwrap().clone()
    }
}

impl Dialer for MockDialer {
    fn retain_peer(&self, id: &PeerId, subscriber: Arc<dyn StatusSubscriber>) -> Result<Arc<dyn Peer>, Error> {
        if self.failing_retains.lock().unwrap().remove(id) {
            return Err(Error::Dialer {
                id: id.clone(),
                reason: "retain refused".to_string(),
            });
        }

        let peer = Arc::new(MockPeer {
            id: id.clone(),
            connection: Mutex::new(self.initial),
        });
        self.registrations.lock().unwrap().insert(
            id.clone(),
            Registration {
                peer: peer.clone(),
                subscriber,
            },
        );

        Ok(peer)
    }

    fn release_peer(&self, id: &PeerId, _subscriber: Arc<dyn StatusSubscriber>) -> Result<(), Error> {
        self.registrations.lock().unwrap().remove(id);
        self.released.lock().unwrap().push(id.clone());
        Ok(())
    }
}

pub fn ids(ids: &[&str]) -> Vec<PeerId> {
    ids.iter().map(|id| PeerId::from(*id)).collect()
}

pub fn add(added: &[&str]) -> ListUpdates {
    ListUpdates {
        additions: ids(added),
        removals: Vec::new(),
    }
}

pub fn remove(removed: &[&str]) -> ListUpdates {
    ListUpdates {
        additions: Vec::new(),
        removals: ids(removed),
    }
}

pub fn ctx_ms(ms: u64) -> Context {
    Context::with_timeout(Duration::from_millis(ms))
}

pub fn no_shuffle() -> PeerListConfig {
    PeerListConfig {
        shuffle: false,
        ..Default::default()
    }
}
