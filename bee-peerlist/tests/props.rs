// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

mod common;

use common::{add, ctx_ms, no_shuffle, remove, MockDialer};

use bee_peerlist::{ConnectionStatus, Error, PeerId, PeerList, Request, RoundRobin};

use proptest::prelude::*;

use std::collections::HashMap;

#[derive(Debug, Clone)]
enum RegistryOp {
    Add(u8),
    Remove(u8),
    Flip(u8),
}

fn arb_registry_op() -> impl Strategy<Value = RegistryOp> {
    prop_oneof![
        (0u8..6).prop_map(RegistryOp::Add),
        (0u8..6).prop_map(RegistryOp::Remove),
        (0u8..6).prop_map(RegistryOp::Flip),
    ]
}

fn peer_name(n: u8) -> String {
    format!("10.0.0.{}:4000", n)
}

proptest! {
    // The facade registry always mirrors the plan set, and the available
    // count always matches the per-peer statuses.
    #[test]
    fn registry_stays_consistent(ops in proptest::collection::vec(arb_registry_op(), 1..60)) {
        let dialer = MockDialer::available();
        let list = PeerList::new("props", dialer.clone(), RoundRobin::new(), no_shuffle());
        list.start().expect("start failed");

        // id -> currently available
        let mut model: HashMap<String, bool> = HashMap::new();

        for op in ops {
            match op {
                RegistryOp::Add(n) => {
                    let id = peer_name(n);
                    let res = list.update(add(&[id.as_str()]));
                    if model.contains_key(&id) {
                        prop_assert_eq!(res, Err(Error::PeerAlreadyInList(PeerId::from(id.as_str()))));
                    } else {
                        prop_assert_eq!(res, Ok(()));
                        model.insert(id, true);
                    }
                }
                RegistryOp::Remove(n) => {
                    let id = peer_name(n);
                    let res = list.update(remove(&[id.as_str()]));
                    if model.remove(&id).is_some() {
                        prop_assert_eq!(res, Ok(()));
                    } else {
                        prop_assert_eq!(res, Err(Error::PeerNotInList(PeerId::from(id.as_str()))));
                    }
                }
                RegistryOp::Flip(n) => {
                    let id = peer_name(n);
                    if let Some(available) = model.get_mut(&id) {
                        *available = !*available;
                        let connection = if *available {
                            ConnectionStatus::Available
                        } else {
                            ConnectionStatus::Unavailable
                        };
                        dialer.set_status(&id, connection);
                    }
                }
            }

            prop_assert_eq!(list.num_peers(), model.len());
            prop_assert_eq!(list.num_available(), model.values().filter(|a| **a).count());
            prop_assert_eq!(list.num_unavailable(), model.values().filter(|a| !**a).count());
            for (id, available) in &model {
                prop_assert_eq!(list.available(&PeerId::from(id.as_str())), *available);
            }
        }
    }

    // For every peer, the pending count equals its selections minus its
    // finished requests, and it never drops below zero.
    #[test]
    fn pending_counts_are_conserved(finish_points in proptest::collection::vec(any::<bool>(), 1..40)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let dialer = MockDialer::available();
            let list = PeerList::new("pending", dialer, RoundRobin::new(), no_shuffle());
            list.start().expect("start failed");
            list.update(add(&["a", "b", "c"])).expect("update failed");

            let mut model: HashMap<String, usize> = HashMap::new();
            let mut outstanding = Vec::new();

            for finish_one in finish_points {
                if finish_one && !outstanding.is_empty() {
                    let (id, finisher): (String, bee_peerlist::Finisher) = outstanding.remove(0);
                    finisher.finish();
                    *model.get_mut(&id).expect("unknown peer finished") -= 1;
                } else {
                    let (peer, finisher) = list
                        .choose(ctx_ms(1_000), &Request::default())
                        .await
                        .expect("choose failed");
                    let id = peer.identifier().to_string();
                    *model.entry(id.clone()).or_default() += 1;
                    outstanding.push((id, finisher));
                }

                let snapshot = list.introspect();
                for peer in &snapshot.peers {
                    let expected = model.get(peer.id.as_str()).copied().unwrap_or(0);
                    prop_assert_eq!(peer.pending_requests, expected);
                }
            }

            // Dropping every outstanding finisher returns all counts to zero.
            outstanding.clear();
            let snapshot = list.introspect();
            for peer in &snapshot.peers {
                prop_assert_eq!(peer.pending_requests, 0);
            }

            Ok(())
        })?;
    }
}
