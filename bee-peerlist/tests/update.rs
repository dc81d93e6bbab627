// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

mod common;

use common::{add, ctx_ms, ids, no_shuffle, remove, MockDialer};

use bee_peerlist::{Error, ListUpdates, PeerId, PeerList, Request, RoundRobin, State};

fn list(dialer: std::sync::Arc<MockDialer>) -> PeerList<RoundRobin> {
    PeerList::new("update", dialer, RoundRobin::new(), no_shuffle())
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_add_is_rejected_but_harmless() {
    let dialer = MockDialer::available();
    let list = list(dialer);

    list.start().expect("start failed");
    list.update(add(&["a"])).expect("update failed");

    let res = list.update(add(&["a"]));
    assert_eq!(res, Err(Error::PeerAlreadyInList(PeerId::from("a"))));
    assert!(res.unwrap_err().to_string().contains('a'));

    assert_eq!(list.num_peers(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn removing_an_absent_peer_is_rejected() {
    let dialer = MockDialer::available();
    let list = list(dialer);

    list.start().expect("start failed");

    let res = list.update(remove(&["ghost"]));
    assert_eq!(res, Err(Error::PeerNotInList(PeerId::from("ghost"))));
}

#[tokio::test(flavor = "multi_thread")]
async fn mixed_batches_apply_the_valid_operations() {
    let dialer = MockDialer::available();
    let list = list(dialer);

    list.start().expect("start failed");
    list.update(add(&["a"])).expect("update failed");

    let res = list.update(ListUpdates {
        additions: ids(&["b", "a"]),
        removals: ids(&["ghost"]),
    });

    match res {
        Err(Error::Multiple(errors)) => {
            assert!(errors.contains(&Error::PeerAlreadyInList(PeerId::from("a"))));
            assert!(errors.contains(&Error::PeerNotInList(PeerId::from("ghost"))));
        }
        other => panic!("expected a combined error, got {:?}", other),
    }

    // "b" went in regardless.
    assert_eq!(list.num_peers(), 2);
    assert!(list.available(&PeerId::from("b")));
}

#[tokio::test(flavor = "multi_thread")]
async fn finisher_outlives_the_removed_peer() {
    let dialer = MockDialer::available();
    let list = list(dialer.clone());

    list.start().expect("start failed");
    list.update(add(&["a"])).expect("update failed");

    let (peer, finisher) = list
        .choose(ctx_ms(1_000), &Request::default())
        .await
        .expect("choose failed");
    assert_eq!(peer.identifier().to_string().as_str(), "a");

    list.update(remove(&["a"])).expect("update failed");

    assert!(!list.available(&PeerId::from("a")));
    assert_eq!(list.num_available(), 0);
    assert_eq!(dialer.released(), ids(&["a"]));

    // Finishing a request for a peer that is gone must be harmless.
    finisher.finish();
}

#[tokio::test(flavor = "multi_thread")]
async fn add_then_remove_restores_the_initial_state() {
    let dialer = MockDialer::available();
    let list = list(dialer.clone());

    list.start().expect("start failed");

    assert_eq!(list.num_peers(), 0);
    assert_eq!(list.num_available(), 0);

    list.update(add(&["a"])).expect("update failed");
    assert_eq!(list.num_peers(), 1);
    assert_eq!(list.num_available(), 1);

    list.update(remove(&["a"])).expect("update failed");
    assert_eq!(list.num_peers(), 0);
    assert_eq!(list.num_available(), 0);
    assert!(list.peers().is_empty());
    assert_eq!(dialer.released(), ids(&["a"]));

    // The identifier can be admitted again.
    list.update(add(&["a"])).expect("update failed");
    assert_eq!(list.num_peers(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_and_re_add_in_one_batch() {
    let dialer = MockDialer::available();
    let list = list(dialer.clone());

    list.start().expect("start failed");
    list.update(add(&["a"])).expect("update failed");

    list.update(ListUpdates {
        additions: ids(&["a"]),
        removals: ids(&["a"]),
    })
    .expect("update failed");

    assert_eq!(list.num_peers(), 1);
    assert_eq!(dialer.released(), ids(&["a"]));
    assert_eq!(dialer.num_retained(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn updates_before_start_are_applied_at_start() {
    let dialer = MockDialer::available();
    let list = list(dialer);

    list.update(add(&["a", "b"])).expect("update failed");
    assert_eq!(list.num_peers(), 0);

    list.start().expect("start failed");
    assert_eq!(list.num_peers(), 2);
    assert_eq!(list.num_available(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_retain_drops_the_addition() {
    let dialer = MockDialer::available();
    let list = list(dialer.clone());

    list.start().expect("start failed");
    dialer.fail_next_retain("a");

    // The batch itself succeeds; the failed retain is only logged.
    list.update(add(&["a", "b"])).expect("update failed");
    assert_eq!(list.num_peers(), 1);
    assert!(list.available(&PeerId::from("b")));

    // The failed identifier left the plan, so removing it errors cleanly and
    // re-adding it works.
    assert_eq!(
        list.update(remove(&["a"])),
        Err(Error::PeerNotInList(PeerId::from("a")))
    );
    list.update(add(&["a"])).expect("update failed");
    assert_eq!(list.num_peers(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn introspection_reflects_the_registry() {
    let dialer = MockDialer::available();
    let list = list(dialer);

    list.start().expect("start failed");
    list.update(add(&["b", "a"])).expect("update failed");

    let (_, finisher) = list
        .choose(ctx_ms(1_000), &Request::default())
        .await
        .expect("choose failed");

    let snapshot = list.introspect();
    assert_eq!(snapshot.name.as_str(), "update");
    assert_eq!(snapshot.state, State::Running);
    assert_eq!(snapshot.peers.len(), 2);
    assert_eq!(snapshot.peers[0].id, PeerId::from("a"));
    assert_eq!(snapshot.peers[1].id, PeerId::from("b"));
    assert_eq!(
        snapshot.peers.iter().map(|p| p.pending_requests).sum::<usize>(),
        1
    );

    serde_json::to_string(&snapshot).expect("snapshot should serialize");

    finisher.finish();
    let snapshot = list.introspect();
    assert_eq!(
        snapshot.peers.iter().map(|p| p.pending_requests).sum::<usize>(),
        0
    );
}
