// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Fewest-pending-requests selection.

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

/// Prefers the peer with the fewest outstanding requests.
///
/// Entries live in a binary min-heap ordered by `(pending, last)`, where
/// `last` is a monotonically increasing selection age. Equally loaded peers
/// are therefore served round-robin: every selection re-ages the winner so
/// the next equally loaded peer wins the following call.
pub struct FewestPending {
    heap: Vec<Entry>,
    next_last: u64,
    rng: StdRng,
}

struct Entry {
    peer: Arc<dyn Peer>,
    pending: usize,
    last: u64,
    score: Arc<Score>,
}

/// Tracks the heap position of one peer; negative once the peer has been
/// removed, which turns stale updates into no-ops.
pub struct Score {
    index: AtomicIsize,
}

impl FewestPending {
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
            heap: Vec::new(),
            next_last: 0,
            rng,
        }
    }

    fn bump(&mut self) -> u64 {
        self.next_last += 1;
        self.next_last
    }

    fn less(&self, a: usize, b: usize) -> bool {
        let (a, b) = (&self.heap[a], &self.heap[b]);
        (a.pending, a.last) < (b.pending, b.last)
    }

    fn swap_entries(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.heap[a].score.index.store(a as isize, Ordering::Relaxed);
        self.heap[b].score.index.store(b as isize, Ordering::Relaxed);
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.less(index, parent) {
                break;
            }
            self.swap_entries(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        loop {
            let left = 2 * index + 1;
            if left >= self.heap.len() {
                break;
            }
            let right = left + 1;
            let mut smallest = left;
            if right < self.heap.len() && self.less(right, left) {
                smallest = right;
            }
            if !self.less(smallest, index) {
                break;
            }
            self.swap_entries(index, smallest);
            index = smallest;
        }
    }

    fn fix(&mut self, index: usize) {
        if index > 0 && self.less(index, (index - 1) / 2) {
            self.sift_up(index);
        } else {
            self.sift_down(index);
        }
    }
}

impl Default for FewestPending {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for FewestPending {
    type Subscriber = Arc<Score>;

    fn add(&mut self, peer: Arc<dyn Peer>, _id: &PeerId) -> Arc<Score> {
        let mut last = self.bump();

        // Trade ages with a random resident so that a batch of simultaneous
        // arrivals does not line up in one fixed order on every client.
        if !self.heap.is_empty() {
            let other = self.rng.gen_range(0..self.heap.len());
            std::mem::swap(&mut last, &mut self.heap[other].last);
            self.fix(other);
        }

        let index = self.heap.len();
        let score = Arc::new(Score {
            index: AtomicIsize::new(index as isize),
        });
        self.heap.push(Entry {
            peer,
            pending: 0,
            last,
            score: score.clone(),
        });
        self.sift_up(index);
        score
    }

    fn remove(&mut self, _id: &PeerId, subscriber: &Arc<Score>) {
        let index = subscriber.index.swap(-1, Ordering::Relaxed);
        if index < 0 {
            return;
        }
        let index = index as usize;
        let last_index = self.heap.len() - 1;

        if index != last_index {
            self.swap_entries(index, last_index);
        }
        if let Some(removed) = self.heap.pop() {
            // swap_entries re-stamped the position; restore the sentinel.
            removed.score.index.store(-1, Ordering::Relaxed);
        }
        if index < self.heap.len() {
            self.fix(index);
        }
    }

    fn choose(&mut self, _request: &Request) -> Option<Arc<dyn Peer>> {
        if self.heap.is_empty() {
            return None;
        }
        // Re-age the winner in place so the next equally loaded peer wins the
        // following call; pending is unchanged, so sifting down suffices.
        let last = self.bump();
        self.heap[0].last = last;
        let peer = self.heap[0].peer.clone();
        self.sift_down(0);
        Some(peer)
    }

    fn update_pending(&mut self, subscriber: &Arc<Score>, pending: usize) {
        let index = subscriber.index.load(Ordering::Relaxed);
        if index < 0 {
            return;
        }
        let index = index as usize;
        self.heap[index].pending = pending;
        self.fix(index);
    }
}
