// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Client-side peer selection for RPC clients.
//!
//! A [`PeerList`] retains a dynamic set of remote peers on behalf of a
//! transport-level [`Dialer`], mirrors the dialer's availability reports into
//! a pluggable selection [`Strategy`], and hands out one available peer per
//! [`choose`](PeerList::choose) call, waiting until one appears or the
//! caller's deadline expires.
//!
//! Four strategies ship with the crate: [`RoundRobin`], [`Random`],
//! [`FewestPending`] and [`TwoRandomChoices`].
//!
//! ## Example
//!
//! ```no_run
//! use bee_peerlist::{
//!     ConnectionStatus, Context, Dialer, Error, ListUpdates, Peer, PeerId, PeerList,
//!     PeerListConfig, PeerStatus, Request, RoundRobin, StatusSubscriber,
//! };
//!
//! use std::{sync::Arc, time::Duration};
//!
//! // A toy transport whose peers are always available.
//! struct StaticDialer;
//!
//! struct StaticPeer(PeerId);
//!
//! impl Peer for StaticPeer {
//!     fn identifier(&self) -> &PeerId {
//!         &self.0
//!     }
//!
//!     fn status(&self) -> PeerStatus {
//!         PeerStatus {
//!             connection: ConnectionStatus::Available,
//!             pending_requests: 0,
//!         }
//!     }
//! }
//!
//! impl Dialer for StaticDialer {
//!     fn retain_peer(
//!         &self,
//!         id: &PeerId,
//!         _subscriber: Arc<dyn StatusSubscriber>,
//!     ) -> Result<Arc<dyn Peer>, Error> {
//!         Ok(Arc::new(StaticPeer(id.clone())))
//!     }
//!
//!     fn release_peer(&self, _id: &PeerId, _subscriber: Arc<dyn StatusSubscriber>) -> Result<(), Error> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let list = PeerList::new(
//!         "example",
//!         Arc::new(StaticDialer),
//!         RoundRobin::new(),
//!         PeerListConfig::default(),
//!     );
//!
//!     list.start()?;
//!     list.update(ListUpdates {
//!         additions: vec![PeerId::from("10.0.0.1:4000"), PeerId::from("10.0.0.2:4000")],
//!         removals: Vec::new(),
//!     })?;
//!
//!     let ctx = Context::with_timeout(Duration::from_secs(1));
//!     let (peer, finisher) = list.choose(ctx, &Request::default()).await?;
//!     println!("sending the request to {}", peer.identifier());
//!     // ... perform the request, then:
//!     finisher.finish();
//!
//!     list.stop()
//! }
//! ```

#![deny(missing_docs)]

mod bind;
mod context;
mod dialer;
mod error;
mod lifecycle;
mod list;

pub mod config;
pub mod peer;
pub mod strategy;

pub use bind::{Bound, Updater};
pub use config::PeerListConfig;
pub use context::{Context, Request};
pub use dialer::{Dialer, StatusSubscriber};
pub use error::Error;
pub use lifecycle::State;
pub use list::{Finisher, ListSnapshot, ListUpdates, PeerList, PeerSnapshot};
pub use peer::{peer_id, ConnectionStatus, Peer, PeerId, PeerStatus};
pub use strategy::{FewestPending, Random, RoundRobin, Strategy, TwoRandomChoices};
