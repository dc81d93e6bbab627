// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use bee_peerlist::{
    ConnectionStatus, Context, Dialer, Error, ListUpdates, Peer, PeerId, PeerList, PeerListConfig,
    PeerStatus, Request, RoundRobin, StatusSubscriber,
};

use log::LevelFilter;

use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

fn setup_logger(level: LevelFilter) {
    fern::Dispatch::new()
        .level(level)
        .chain(io::stdout())
        .apply()
        .expect("fern");
}

fn read_config() -> PeerListConfig {
    let config_json = r#"
    {
        "capacity": 8,
        "shuffle": true,
        "defaultChooseTimeoutMs": 1000
    }"#;

    serde_json::from_str(config_json).expect("error deserializing json config")
}

type DemoPeers = Arc<Mutex<HashMap<PeerId, (Arc<DemoPeer>, Arc<dyn StatusSubscriber>)>>>;

// An in-memory transport: every peer starts out connecting and becomes
// available shortly after it has been retained.
#[derive(Default)]
struct DemoDialer {
    peers: DemoPeers,
}

struct DemoPeer {
    id: PeerId,
    connection: Mutex<ConnectionStatus>,
}

impl Peer for DemoPeer {
    fn identifier(&self) -> &PeerId {
        &self.id
    }

    fn status(&self) -> PeerStatus {
        PeerStatus {
            connection: *self.connection.lock().expect("demo peer lock"),
            pending_requests: 0,
        }
    }
}

impl Dialer for DemoDialer {
    fn retain_peer(&self, id: &PeerId, subscriber: Arc<dyn StatusSubscriber>) -> Result<Arc<dyn Peer>, Error> {
        let peer = Arc::new(DemoPeer {
            id: id.clone(),
            connection: Mutex::new(ConnectionStatus::Connecting),
        });
        self.peers
            .lock()
            .expect("demo dialer lock")
            .insert(id.clone(), (peer.clone(), subscriber));

        // Simulate the connection coming up a little later.
        let peers = self.peers.clone();
        let id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            connect(&peers, &id);
        });

        Ok(peer)
    }

    fn release_peer(&self, id: &PeerId, _subscriber: Arc<dyn StatusSubscriber>) -> Result<(), Error> {
        self.peers.lock().expect("demo dialer lock").remove(id);
        Ok(())
    }
}

fn connect(peers: &DemoPeers, id: &PeerId) {
    let subscriber = {
        let peers = peers.lock().expect("demo dialer lock");
        match peers.get(id) {
            Some((peer, subscriber)) => {
                *peer.connection.lock().expect("demo peer lock") = ConnectionStatus::Available;
                subscriber.clone()
            }
            None => return,
        }
    };
    subscriber.notify_status_changed();
}

#[tokio::main]
async fn main() {
    setup_logger(LevelFilter::Debug);

    let config = read_config();
    println!("{:#?}", config);

    let dialer = Arc::new(DemoDialer::default());
    let list = PeerList::new("demo", dialer.clone(), RoundRobin::new(), config);

    list.start().expect("starting the peer list failed");
    list.update(ListUpdates {
        additions: vec![
            PeerId::from("10.0.0.1:4000"),
            PeerId::from("10.0.0.2:4000"),
            PeerId::from("10.0.0.3:4000"),
        ],
        removals: Vec::new(),
    })
    .expect("updating the peer list failed");

    for round in 0..10 {
        let ctx = Context::with_timeout(Duration::from_secs(2));
        match list.choose(ctx, &Request::default()).await {
            Ok((peer, finisher)) => {
                log::info!("Round {}: chose {}.", round, peer.identifier());
                // A real client would perform its request here.
                finisher.finish();
            }
            Err(e) => log::warn!("Round {}: no peer ({}).", round, e),
        }
    }

    println!("{}", serde_json::to_string_pretty(&list.introspect()).expect("snapshot"));

    list.stop().expect("stopping the peer list failed");
}
