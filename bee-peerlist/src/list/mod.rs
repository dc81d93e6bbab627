// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The peer list: retained-peer registry, update pipeline and blocking choose.

mod facade;

use facade::{ListCore, PeerFacade};

use crate::{
    config::PeerListConfig,
    context::{Context, Request},
    dialer::{Dialer, StatusSubscriber},
    error::Error,
    lifecycle::{LifecycleOnce, State},
    peer::{ConnectionStatus, Peer, PeerId},
    strategy::Strategy,
};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;
use tokio::{
    sync::Notify,
    time::{self, Instant},
};

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex, Weak},
    time::Duration,
};

/// A batch of peer additions and removals.
#[derive(Clone, Debug, Default)]
pub struct ListUpdates {
    /// Identifiers to start retaining.
    pub additions: Vec<PeerId>,
    /// Identifiers to stop retaining.
    pub removals: Vec<PeerId>,
}

/// A point-in-time view of one retained peer.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerSnapshot {
    /// The peer identifier.
    pub id: PeerId,
    /// The cached connection status.
    pub connection: ConnectionStatus,
    /// The number of outstanding requests.
    pub pending_requests: usize,
}

/// A point-in-time view of a list and its peers.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSnapshot {
    /// The list name.
    pub name: String,
    /// The lifecycle state at snapshot time.
    pub state: State,
    /// Per-peer details, ordered by identifier.
    pub peers: Vec<PeerSnapshot>,
}

/// A dynamic set of retained peers with a pluggable selection strategy.
///
/// The list tracks which peers a caller wants retained (via
/// [`update`](PeerList::update)), asks its [`Dialer`] to retain or release
/// them, mirrors the dialer's availability reports into the strategy, and
/// hands out one available peer per [`choose`](PeerList::choose) call,
/// waiting for one to appear when necessary.
///
/// Cloning is cheap and shares the same list.
pub struct PeerList<S: Strategy> {
    inner: Arc<ListInner<S>>,
}

impl<S: Strategy> Clone for PeerList<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct ListInner<S: Strategy> {
    name: String,
    weak: Weak<ListInner<S>>,
    dialer: Arc<dyn Dialer>,
    lifecycle: LifecycleOnce,
    peer_available: Notify,
    fail_fast: bool,
    shuffle: bool,
    default_choose_timeout: Option<Duration>,
    shuffle_rng: Mutex<StdRng>,
    updates: Mutex<Updates>,
    guarded: Mutex<Guarded<S>>,
}

#[derive(Default)]
struct Updates {
    // The identifiers the caller wants retained, after all applied deltas.
    plan: HashSet<PeerId>,
    // Deltas not yet flushed into the guarded state.
    queue: VecDeque<Op>,
}

enum Op {
    Add(PeerId),
    Remove(PeerId),
}

struct Guarded<S: Strategy> {
    peers: HashMap<PeerId, PeerEntry<S>>,
    strategy: S,
    available: usize,
}

struct PeerEntry<S: Strategy> {
    facade: Arc<PeerFacade>,
    // Present iff the peer is currently in the strategy.
    subscriber: Option<S::Subscriber>,
}

impl<S: Strategy> PeerList<S> {
    /// Creates an idle peer list.
    pub fn new(name: impl Into<String>, dialer: Arc<dyn Dialer>, strategy: S, config: PeerListConfig) -> Self {
        let shuffle_rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let peers = match config.capacity {
            Some(capacity) => HashMap::with_capacity(capacity),
            None => HashMap::new(),
        };

        let inner = Arc::new_cyclic(|weak| ListInner {
            name: name.into(),
            weak: weak.clone(),
            dialer,
            lifecycle: LifecycleOnce::new(),
            peer_available: Notify::new(),
            fail_fast: config.fail_fast,
            shuffle: config.shuffle,
            default_choose_timeout: config.default_choose_timeout(),
            shuffle_rng: Mutex::new(shuffle_rng),
            updates: Mutex::new(Updates::default()),
            guarded: Mutex::new(Guarded {
                peers,
                strategy,
                available: 0,
            }),
        });

        Self { inner }
    }

    /// Returns the list name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> State {
        self.inner.lifecycle.state()
    }

    /// Returns `true` while the list is running.
    pub fn is_running(&self) -> bool {
        self.inner.lifecycle.is_running()
    }

    /// Starts the list and flushes all updates that accumulated before the
    /// start. Idempotent: later calls return the first result.
    pub fn start(&self) -> Result<(), Error> {
        self.inner.lifecycle.start(|| {
            log::info!("Starting peer list {}.", self.inner.name);

            let mut updates = self.inner.updates.lock().expect("error locking update queue");
            self.inner.flush(&mut updates);

            Ok(())
        })
    }

    /// Stops the list, releasing every retained peer. Idempotent: later calls
    /// return the first result.
    pub fn stop(&self) -> Result<(), Error> {
        let res = self.inner.lifecycle.stop(|| {
            log::info!("Stopping peer list {}.", self.inner.name);

            // Queued deltas are obsolete once every peer is released.
            self.inner
                .updates
                .lock()
                .expect("error locking update queue")
                .queue
                .clear();

            let mut errors = Vec::new();
            let mut guarded = self.inner.guarded.lock().expect("error locking peer list");
            let ids = guarded.peers.keys().cloned().collect::<Vec<_>>();
            for id in ids {
                if let Err(e) = self.inner.release(&mut guarded, &id) {
                    errors.push(e);
                }
            }
            drop(guarded);

            Error::combine(errors)
        });

        // Wake blocked choosers so they observe the terminal state.
        self.inner.peer_available.notify_waiters();

        res
    }

    /// Applies a batch of additions and removals.
    ///
    /// Removals are applied before additions, so removing and re-adding an
    /// identifier in one batch is valid. Additions are shuffled unless the
    /// list was configured otherwise. Invalid operations do not abort the
    /// batch; their errors are aggregated and returned once the valid
    /// operations have been applied.
    pub fn update(&self, updates: ListUpdates) -> Result<(), Error> {
        let ListUpdates {
            mut additions,
            removals,
        } = updates;

        if self.inner.shuffle {
            let mut rng = self.inner.shuffle_rng.lock().expect("error locking rng");
            additions.shuffle(&mut *rng);
        }

        let mut errors = Vec::new();
        let mut queued = self.inner.updates.lock().expect("error locking update queue");

        for id in removals {
            if queued.plan.remove(&id) {
                queued.queue.push_back(Op::Remove(id));
            } else {
                errors.push(Error::PeerNotInList(id));
            }
        }
        for id in additions {
            if queued.plan.insert(id.clone()) {
                queued.queue.push_back(Op::Add(id));
            } else {
                errors.push(Error::PeerAlreadyInList(id));
            }
        }

        if self.inner.lifecycle.state().is_active() {
            self.inner.flush(&mut queued);
        }
        drop(queued);

        Error::combine(errors)
    }

    /// Selects one available peer, waiting for one to appear if necessary.
    ///
    /// A deadline is mandatory: either on `ctx` or, for contexts without one,
    /// through the list's default choose timeout. Returns the chosen peer and
    /// a [`Finisher`] that marks the request finished when dropped.
    pub async fn choose(&self, ctx: Context, request: &Request) -> Result<(Arc<dyn Peer>, Finisher), Error> {
        let deadline = match ctx.deadline() {
            Some(deadline) => deadline,
            None => match self.inner.default_choose_timeout {
                Some(timeout) => Instant::now() + timeout,
                None => return Err(Error::MissingDeadline),
            },
        };

        self.inner
            .lifecycle
            .wait_until_running(deadline)
            .await
            .map_err(|e| match e {
                Error::NotRunning(reason) => Error::NotRunning(format!("peer list {}: {}", self.inner.name, reason)),
                e => e,
            })?;

        loop {
            if !self.inner.lifecycle.is_running() {
                return Err(Error::NotRunning(format!("peer list {}: stopped", self.inner.name)));
            }

            if let Some(chosen) = self.inner.try_choose(request) {
                return Ok(chosen);
            }

            if self.inner.fail_fast {
                return Err(Error::NoPeerAvailable("failing fast on an empty list".to_string()));
            }

            let available = self.inner.peer_available.notified();
            tokio::select! {
                _ = available => {}
                _ = time::sleep_until(deadline) => {
                    log::debug!("Choose on peer list {} timed out.", self.inner.name);
                    return Err(Error::NoPeerAvailable(
                        "deadline expired while waiting for a peer to become available".to_string(),
                    ));
                }
            }
        }
    }

    /// Entry point for dialers reporting a connection status change for `id`.
    ///
    /// A no-op for identifiers that are not retained.
    pub fn notify_status_changed(&self, id: &PeerId) {
        ListCore::peer_status_changed(&*self.inner, id);
    }

    /// Returns all retained peers with their cached status.
    pub fn peers(&self) -> Vec<Arc<dyn Peer>> {
        let guarded = self.inner.guarded.lock().expect("error locking peer list");
        guarded
            .peers
            .values()
            .map(|entry| entry.facade.clone() as Arc<dyn Peer>)
            .collect()
    }

    /// Returns the number of retained peers.
    pub fn num_peers(&self) -> usize {
        self.inner.guarded.lock().expect("error locking peer list").peers.len()
    }

    /// Returns the number of currently available peers.
    pub fn num_available(&self) -> usize {
        self.inner.guarded.lock().expect("error locking peer list").available
    }

    /// Returns the number of retained but currently unavailable peers.
    pub fn num_unavailable(&self) -> usize {
        let guarded = self.inner.guarded.lock().expect("error locking peer list");
        guarded.peers.len() - guarded.available
    }

    /// Returns `true` if `id` is retained and currently available.
    pub fn available(&self, id: &PeerId) -> bool {
        let guarded = self.inner.guarded.lock().expect("error locking peer list");
        guarded
            .peers
            .get(id)
            .map_or(false, |entry| entry.facade.connection_status() == ConnectionStatus::Available)
    }

    /// Returns a serializable snapshot of the list and its peers.
    pub fn introspect(&self) -> ListSnapshot {
        let guarded = self.inner.guarded.lock().expect("error locking peer list");
        let mut peers = guarded
            .peers
            .values()
            .map(|entry| {
                let status = entry.facade.status();
                PeerSnapshot {
                    id: entry.facade.id().clone(),
                    connection: status.connection,
                    pending_requests: status.pending_requests,
                }
            })
            .collect::<Vec<_>>();
        peers.sort_by(|a, b| a.id.cmp(&b.id));

        ListSnapshot {
            name: self.inner.name.clone(),
            state: self.inner.lifecycle.state(),
            peers,
        }
    }
}

impl<S: Strategy> ListInner<S> {
    // Drains the update queue into the guarded state. The caller holds the
    // update queue lock; the list lock is acquired here, in that order.
    fn flush(&self, updates: &mut Updates) {
        let mut guarded = self.guarded.lock().expect("error locking peer list");

        while let Some(op) = updates.queue.pop_front() {
            match op {
                Op::Add(id) => self.admit(&mut guarded, &mut updates.plan, id),
                Op::Remove(id) => {
                    // Release errors are logged inside; a failed release must
                    // not keep the rest of the batch from applying.
                    let _ = self.release(&mut guarded, &id);
                }
            }
        }
    }

    // Retains `id` with the dialer and registers its facade. A failed retain
    // drops the addition and its plan entry.
    fn admit(&self, guarded: &mut Guarded<S>, plan: &mut HashSet<PeerId>, id: PeerId) {
        let facade = Arc::new(PeerFacade::new(id.clone(), self.weak.clone() as Weak<dyn ListCore>));

        let subscriber: Arc<dyn StatusSubscriber> = facade.clone();
        let peer = match self.dialer.retain_peer(&id, subscriber) {
            Ok(peer) => peer,
            Err(e) => {
                log::error!("Failed to retain peer {}: {}.", id, e);
                plan.remove(&id);
                return;
            }
        };
        facade.set_peer(peer);

        guarded.peers.insert(
            id.clone(),
            PeerEntry {
                facade,
                subscriber: None,
            },
        );

        // Let the facade join the strategy right away if the dialer already
        // reports it available.
        self.sync_status(guarded, &id);
    }

    // Removes `id` from the strategy and the registry, then releases it with
    // the dialer. A no-op for identifiers that are not retained.
    fn release(&self, guarded: &mut Guarded<S>, id: &PeerId) -> Result<(), Error> {
        let mut entry = match guarded.peers.remove(id) {
            Some(entry) => entry,
            None => return Ok(()),
        };

        if let Some(subscriber) = entry.subscriber.take() {
            guarded.strategy.remove(id, &subscriber);
            guarded.available -= 1;
        }
        entry.facade.set_connection_status(ConnectionStatus::Unavailable);

        let subscriber: Arc<dyn StatusSubscriber> = entry.facade.clone();
        let res = self.dialer.release_peer(id, subscriber);
        if let Err(e) = &res {
            log::error!("Failed to release peer {}: {}.", id, e);
        }
        res
    }

    // Reconciles the cached connection status of `id` with the dialer's
    // current report, moving the facade in or out of the strategy.
    fn sync_status(&self, guarded: &mut Guarded<S>, id: &PeerId) {
        let Guarded {
            peers,
            strategy,
            available,
        } = guarded;

        let entry = match peers.get_mut(id) {
            Some(entry) => entry,
            None => return,
        };
        let peer = match entry.facade.dialer_peer() {
            Some(peer) => peer,
            None => return,
        };

        let status = peer.status().connection;
        if status == entry.facade.connection_status() {
            return;
        }
        entry.facade.set_connection_status(status);

        if status == ConnectionStatus::Available {
            if entry.subscriber.is_none() {
                let subscriber = strategy.add(entry.facade.clone() as Arc<dyn Peer>, id);
                let pending = entry.facade.pending();
                if pending > 0 {
                    strategy.update_pending(&subscriber, pending);
                }
                entry.subscriber = Some(subscriber);
                *available += 1;
                self.peer_available.notify_one();
            }
        } else if let Some(subscriber) = entry.subscriber.take() {
            strategy.remove(id, &subscriber);
            *available -= 1;
        }
    }

    // Asks the strategy for a peer and, on success, opens the request
    // accounting for it.
    fn try_choose(&self, request: &Request) -> Option<(Arc<dyn Peer>, Finisher)> {
        let mut guarded = self.guarded.lock().expect("error locking peer list");
        let Guarded {
            peers, strategy, ..
        } = &mut *guarded;

        let peer = strategy.choose(request)?;
        let entry = peers.get(peer.identifier())?;
        let chosen = entry.facade.dialer_peer()?;

        let facade = entry.facade.clone();
        let pending = facade.increment_pending();
        if let Some(subscriber) = &entry.subscriber {
            strategy.update_pending(subscriber, pending);
        }

        // Cascade the wakeup to the next blocked chooser, if any.
        self.peer_available.notify_one();

        let finisher = Finisher {
            facade: Some(facade),
            list: self.weak.clone() as Weak<dyn ListCore>,
        };
        Some((chosen, finisher))
    }
}

impl<S: Strategy> ListCore for ListInner<S> {
    fn peer_status_changed(&self, id: &PeerId) {
        let mut guarded = self.guarded.lock().expect("error locking peer list");
        self.sync_status(&mut guarded, id);
    }

    fn request_finished(&self, facade: &Arc<PeerFacade>) {
        let mut guarded = self.guarded.lock().expect("error locking peer list");
        let pending = facade.decrement_pending();

        let Guarded {
            peers, strategy, ..
        } = &mut *guarded;

        // Only notify the strategy if this facade is still the retained one;
        // the identifier may have been removed or re-added since.
        if let Some(entry) = peers.get(facade.id()) {
            if Arc::ptr_eq(&entry.facade, facade) {
                if let Some(subscriber) = &entry.subscriber {
                    strategy.update_pending(subscriber, pending);
                }
            }
        }
    }
}

/// Completion guard for a chosen peer.
///
/// Dropping the finisher (or calling [`finish`](Finisher::finish)) marks the
/// request finished and decrements the peer's pending-request count. The
/// guard stays valid after the peer has been removed from the list and after
/// the list has stopped.
pub struct Finisher {
    facade: Option<Arc<PeerFacade>>,
    list: Weak<dyn ListCore>,
}

impl Finisher {
    /// Marks the request finished now.
    pub fn finish(mut self) {
        self.complete();
    }

    fn complete(&mut self) {
        let facade = match self.facade.take() {
            Some(facade) => facade,
            None => return,
        };
        match self.list.upgrade() {
            Some(list) => list.request_finished(&facade),
            None => {
                facade.decrement_pending();
            }
        }
    }
}

impl Drop for Finisher {
    fn drop(&mut self) {
        self.complete();
    }
}
