// Copyright 2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Errors surfaced by the peer list.

use crate::peer::PeerId;

/// Errors returned by peer list operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// `choose` was called without a deadline on a list that has no default
    /// choose timeout.
    #[error("choosing a peer requires a deadline")]
    MissingDeadline,
    /// The operation needed a running list.
    #[error("peer list is not running: {0}")]
    NotRunning(String),
    /// No peer could be selected.
    #[error("no peer available: {0}")]
    NoPeerAvailable(String),
    /// An addition named an identifier that is already retained.
    #[error("peer {0} is already in the list")]
    PeerAlreadyInList(PeerId),
    /// A removal named an identifier that is not retained.
    #[error("peer {0} is not in the list")]
    PeerNotInList(PeerId),
    /// The dialer rejected a retain or release.
    #[error("dialer failed for peer {id}: {reason}")]
    Dialer {
        /// The peer the dialer failed for.
        id: PeerId,
        /// The dialer's own description of the failure.
        reason: String,
    },
    /// Several operations of a batch failed.
    #[error("{}", join(.0))]
    Multiple(Vec<Error>),
}

impl Error {
    /// Folds a batch of errors into a single result.
    pub(crate) fn combine(mut errors: Vec<Error>) -> Result<(), Error> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Error::Multiple(errors)),
        }
    }
}

fn join(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
