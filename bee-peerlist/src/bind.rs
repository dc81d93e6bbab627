// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Coupling a peer list with the component that feeds it updates.

use crate::{
    context::{Context, Request},
    error::Error,
    list::{Finisher, PeerList},
    peer::Peer,
    strategy::Strategy,
};

use tokio::sync::Mutex;

use std::sync::Arc;

/// A component that feeds [`update`](crate::PeerList::update) calls to a peer
/// list while it is running, e.g. a DNS watcher.
///
/// Both methods must be idempotent.
#[async_trait::async_trait]
pub trait Updater: Send + Sync {
    /// Starts delivering updates.
    async fn start(&self) -> Result<(), Error>;

    /// Stops delivering updates.
    async fn stop(&self) -> Result<(), Error>;
}

/// A peer list bound to its updater, so that both start and stop together.
///
/// The binding is itself a chooser: [`choose`](Bound::choose) delegates to
/// the bound list.
pub struct Bound<S: Strategy> {
    list: PeerList<S>,
    updater: Box<dyn Updater>,
    results: Mutex<Results>,
}

#[derive(Default)]
struct Results {
    start: Option<Result<(), Error>>,
    stop: Option<Result<(), Error>>,
}

impl<S: Strategy> Bound<S> {
    /// Couples `list` with `updater`.
    pub fn new(list: PeerList<S>, updater: Box<dyn Updater>) -> Self {
        Self {
            list,
            updater,
            results: Mutex::new(Results::default()),
        }
    }

    /// Starts the list, then the updater. If the updater fails to start, the
    /// list is stopped again and all errors are returned combined.
    /// Idempotent: later calls return the first result.
    pub async fn start(&self) -> Result<(), Error> {
        let mut results = self.results.lock().await;
        if let Some(res) = &results.start {
            return res.clone();
        }

        let res = match self.list.start() {
            Err(e) => Err(e),
            Ok(()) => match self.updater.start().await {
                Ok(()) => Ok(()),
                Err(updater_err) => {
                    log::warn!("Updater of peer list {} failed to start; stopping the list.", self.list.name());

                    let mut errors = vec![updater_err];
                    if let Err(stop_err) = self.list.stop() {
                        errors.push(stop_err);
                    }
                    Error::combine(errors)
                }
            },
        };

        results.start = Some(res.clone());
        res
    }

    /// Stops the updater, then the list. Idempotent: later calls return the
    /// first result.
    pub async fn stop(&self) -> Result<(), Error> {
        let mut results = self.results.lock().await;
        if let Some(res) = &results.stop {
            return res.clone();
        }

        let mut errors = Vec::new();
        if let Err(e) = self.updater.stop().await {
            errors.push(e);
        }
        if let Err(e) = self.list.stop() {
            errors.push(e);
        }

        let res = Error::combine(errors);
        results.stop = Some(res.clone());
        res
    }

    /// Chooses a peer from the bound list.
    pub async fn choose(&self, ctx: Context, request: &Request) -> Result<(Arc<dyn Peer>, Finisher), Error> {
        self.list.choose(ctx, request).await
    }

    /// Returns the bound list.
    pub fn list(&self) -> &PeerList<S> {
        &self.list
    }
}
