// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Two-random-choices selection.

use super::Strategy;

use crate::{
    context::Request,
    peer::{Peer, PeerId},
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use std::sync::{
    atomic::{AtomicIsize, AtomicUsize, Ordering},
    Arc,
};

/// Samples two distinct peers and returns the less loaded one.
///
/// With many independent clients this spreads load nearly as evenly as a
/// global fewest-pending policy while staying O(1) per call.
pub struct TwoRandomChoices {
    entries: Vec<Entry>,
    rng: StdRng,
}

struct Entry {
    peer: Arc<dyn Peer>,
    load: Arc<Load>,
}

/// Vector position and cached pending count of one peer. The position turns
/// negative once the peer has been removed, which makes stale updates
/// harmless.
pub struct Load {
    index: AtomicIsize,
    pending: AtomicUsize,
}

impl TwoRandomChoices {
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

impl Default for TwoRandomChoices {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for TwoRandomChoices {
    type Subscriber = Arc<Load>;

    fn add(&mut self, peer: Arc<dyn Peer>, _id: &PeerId) -> Arc<Load> {
        let load = Arc::new(Load {
            index: AtomicIsize::new(self.entries.len() as isize),
            pending: AtomicUsize::new(0),
        });
        self.entries.push(Entry {
            peer,
            load: load.clone(),
        });
        load
    }

    fn remove(&mut self, _id: &PeerId, subscriber: &Arc<Load>) {
        let index = subscriber.index.swap(-1, Ordering::Relaxed);
        if index < 0 {
            return;
        }
        let index = index as usize;

        self.entries.swap_remove(index);
        if index < self.entries.len() {
            self.entries[index].load.index.store(index as isize, Ordering::Relaxed);
        }
    }

    fn choose(&mut self, _request: &Request) -> Option<Arc<dyn Peer>> {
        match self.entries.len() {
            0 => None,
            1 => Some(self.entries[0].peer.clone()),
            len => {
                let first = self.rng.gen_range(0..len);
                let mut second = self.rng.gen_range(0..len - 1);
                if second >= first {
                    second += 1;
                }

                let (first, second) = (&self.entries[first], &self.entries[second]);
                // Ties go to the first draw.
                let chosen = if first.load.pending.load(Ordering::Relaxed)
                    <= second.load.pending.load(Ordering::Relaxed)
                {
                    first
                } else {
                    second
                };
                Some(chosen.peer.clone())
            }
        }
    }

    fn update_pending(&mut self, subscriber: &Arc<Load>, pending: usize) {
        subscriber.pending.store(pending, Ordering::Relaxed);
    }
}
