// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Uniformly random selection.

use super::Strategy;

use crate::{
    context::Request,
    peer::{Peer, PeerId},
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use std::sync::{
    atomic::{AtomicIsize, Ordering},
    Arc,
};

/// Picks an available peer uniformly at random.
pub struct Random {
    entries: Vec<Entry>,
    rng: StdRng,
}

struct Entry {
    peer: Arc<dyn Peer>,
    slot: Arc<Slot>,
}

/// Tracks the vector position of one peer; negative once the peer has been
/// removed, which turns stale updates into no-ops.
pub struct Slot {
    index: AtomicIsize,
}

impl Random {
    /// Creates a randomly seeded strategy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates a strategy with a deterministic seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            entries: Vec::new(),
            rng,
        }
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for Random {
    type Subscriber = Arc<Slot>;

    fn add(&mut self, peer: Arc<dyn Peer>, _id: &PeerId) -> Arc<Slot> {
        let slot = Arc::new(Slot {
            index: AtomicIsize::new(self.entries.len() as isize),
        });
        self.entries.push(Entry {
            peer,
            slot: slot.clone(),
        });
        slot
    }

    fn remove(&mut self, _id: &PeerId, subscriber: &Arc<Slot>) {
        let index = subscriber.index.swap(-1, Ordering::Relaxed);
        if index < 0 {
            return;
        }
        let index = index as usize;

        self.entries.swap_remove(index);
        if index < self.entries.len() {
            self.entries[index].slot.index.store(index as isize, Ordering::Relaxed);
        }
    }

    fn choose(&mut self, _request: &Request) -> Option<Arc<dyn Peer>> {
        if self.entries.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.entries.len());
        Some(self.entries[index].peer.clone())
    }

    fn update_pending(&mut self, _subscriber: &Arc<Slot>, _pending: usize) {}
}
