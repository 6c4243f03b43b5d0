//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use tracing::{error, warn, warn_span};

use crate::collections::NeighborKey;
use crate::packet::error::DecodeError;
use crate::packet::lsa::LsaKey;

/// Errors surfaced by the neighbor link-state synchronization core.
///
/// Most variants are handled locally (the offending packet or LSA is
/// dropped and a counter incremented); [`Error::QueueOverflow`] and
/// [`Error::NeighborDead`] are surfaced to the owning instance, which
/// reacts by resetting the adjacency.
#[derive(Debug)]
pub enum Error {
    /// A received packet failed to decode.
    MalformedPacket(NeighborKey, DecodeError),
    /// A packet referenced a neighbor not present in the neighbor table.
    UnknownNeighbor(Ipv4Addr),
    /// An LSA-phase packet arrived while the adjacency had not yet
    /// reached the Exchange state.
    WrongAdjacencyState(NeighborKey, crate::neighbor::nsm::State),
    /// The LSDB declined to install a submitted LSA instance.
    LsdbReject(LsaKey),
    /// An outbound queue stayed saturated past its backpressure limit.
    QueueOverflow(NeighborKey),
    /// The retransmission timer observed no activity past `DeadInterval`.
    NeighborDead(NeighborKey),
}

impl Error {
    pub fn log(&self) {
        match self {
            Error::MalformedPacket(nbr_key, decode_err) => {
                warn_span!("neighbor", ?nbr_key).in_scope(|| {
                    warn!(error = %decode_err, "{}", self);
                })
            }
            Error::UnknownNeighbor(router_id) => {
                warn!(%router_id, "{}", self);
            }
            Error::WrongAdjacencyState(nbr_key, state) => {
                warn_span!("neighbor", ?nbr_key).in_scope(|| {
                    warn!(?state, "{}", self);
                })
            }
            Error::LsdbReject(lsa_key) => {
                warn!(?lsa_key, "{}", self);
            }
            Error::QueueOverflow(nbr_key) => {
                error!(?nbr_key, "{}", self);
            }
            Error::NeighborDead(nbr_key) => {
                error!(?nbr_key, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MalformedPacket(..) => {
                write!(f, "failed to decode packet")
            }
            Error::UnknownNeighbor(..) => {
                write!(f, "packet for unknown neighbor")
            }
            Error::WrongAdjacencyState(..) => {
                write!(f, "LSA-phase packet received before Exchange state")
            }
            Error::LsdbReject(..) => {
                write!(f, "LSDB rejected LSA install")
            }
            Error::QueueOverflow(..) => {
                write!(f, "outbound queue saturated past backpressure limit")
            }
            Error::NeighborDead(..) => {
                write!(f, "neighbor declared dead by retransmission timer")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedPacket(_, error) => Some(error),
            _ => None,
        }
    }
}
