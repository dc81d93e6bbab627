// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! An idempotent start/stop state machine.

use crate::error::Error;

use serde::Serialize;
use tokio::{
    sync::watch,
    time::{self, Instant},
};

use std::{fmt, sync::Mutex};

/// The lifecycle state of a peer list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum State {
    /// Neither started nor stopped yet.
    Idle,
    /// The start routine is executing.
    Starting,
    /// Started successfully.
    Running,
    /// The stop routine is executing.
    Stopping,
    /// Stopped, or failed to start.
    Stopped,
}

impl State {
    /// Returns `true` for [`State::Running`].
    pub fn is_running(&self) -> bool {
        matches!(self, State::Running)
    }

    pub(crate) fn is_active(&self) -> bool {
        matches!(self, State::Starting | State::Running)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Idle => write!(f, "idle"),
            State::Starting => write!(f, "starting"),
            State::Running => write!(f, "running"),
            State::Stopping => write!(f, "stopping"),
            State::Stopped => write!(f, "stopped"),
        }
    }
}

// Runs the start routine and the stop routine at most once each, remembers
// their results, and lets tasks wait for the Running state. Transitions are
// serialized by the results lock; state changes are broadcast over a watch
// channel so waiters wake without polling.
pub(crate) struct LifecycleOnce {
    state: watch::Sender<State>,
    results: Mutex<Results>,
}

#[derive(Default)]
struct Results {
    start: Option<Result<(), Error>>,
    stop: Option<Result<(), Error>>,
}

impl LifecycleOnce {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(State::Idle);

        Self {
            state,
            results: Mutex::new(Results::default()),
        }
    }

    pub(crate) fn state(&self) -> State {
        *self.state.borrow()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state().is_running()
    }

    // Runs `f` on the first call, transitioning Idle -> Starting -> Running
    // (or Stopped if `f` fails). Later calls return the first result.
    pub(crate) fn start<F>(&self, f: F) -> Result<(), Error>
    where
        F: FnOnce() -> Result<(), Error>,
    {
        let mut results = self.results.lock().expect("error locking lifecycle results");

        match self.state() {
            State::Idle => {
                self.state.send_replace(State::Starting);
                let res = f();
                self.state.send_replace(if res.is_ok() { State::Running } else { State::Stopped });
                results.start = Some(res.clone());
                res
            }
            _ => match results.start.clone() {
                Some(res) => res,
                None => Err(Error::NotRunning("stopped before it was started".to_string())),
            },
        }
    }

    // Runs `f` on the first call from Running; transitions Idle directly to
    // Stopped without running `f`. Later calls return the first result.
    pub(crate) fn stop<F>(&self, f: F) -> Result<(), Error>
    where
        F: FnOnce() -> Result<(), Error>,
    {
        let mut results = self.results.lock().expect("error locking lifecycle results");

        match self.state() {
            State::Running => {
                self.state.send_replace(State::Stopping);
                let res = f();
                self.state.send_replace(State::Stopped);
                results.stop = Some(res.clone());
                res
            }
            State::Idle => {
                self.state.send_replace(State::Stopped);
                results.stop = Some(Ok(()));
                Ok(())
            }
            _ => results.stop.clone().unwrap_or(Ok(())),
        }
    }

    // Waits until the state reaches Running, a terminal state, or the
    // deadline, whichever comes first.
    pub(crate) async fn wait_until_running(&self, deadline: Instant) -> Result<(), Error> {
        let mut rx = self.state.subscribe();

        loop {
            match *rx.borrow_and_update() {
                State::Running => return Ok(()),
                State::Stopping | State::Stopped => {
                    return Err(Error::NotRunning("stopped".to_string()));
                }
                State::Idle | State::Starting => {}
            }

            match time::timeout_at(deadline, rx.changed()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => return Err(Error::NotRunning("dropped".to_string())),
                Err(_) => {
                    return Err(Error::NotRunning(
                        "deadline expired while waiting for the start".to_string(),
                    ));
                }
            }
        }
    }
}
