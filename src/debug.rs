//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Structured debug logging, one variant per loggable event. Kept separate
//! from [`crate::error::Error`], which covers rejections and malformed
//! input; this module covers ordinary protocol events worth tracing at
//! debug level.

use tracing::{debug, debug_span};

use crate::collections::NeighborNetId;
use crate::lsdb::LsdbRejectReason;
use crate::packet::lsa::LsaKey;
use crate::packet::PacketType;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Debug<'a> {
    /// A packet was received from a neighbor.
    PacketRx(&'a NeighborNetId, PacketType),
    /// A packet was sent to a neighbor.
    PacketTx(&'a NeighborNetId, PacketType),
    /// An LSA instance from an LSU was accepted and handed to the LSDB.
    LsaInstall(&'a NeighborNetId, &'a LsaKey),
    /// An LSA instance from an LSU was discarded (not newer, or rejected).
    LsaDiscard(&'a NeighborNetId, &'a LsaKey, LsdbRejectReason),
    /// A received instance matched one on our own retransmission list,
    /// implicitly acknowledging it without an explicit LSAck.
    ImplicitAck(&'a NeighborNetId, &'a LsaKey),
    /// An LSAck arrived for an instance not on the retransmission list.
    UnexpectedAck(&'a NeighborNetId, &'a LsaKey),
    /// An LSAck was matched and removed from the retransmission list.
    AckProcessed(&'a NeighborNetId, &'a LsaKey),
    /// A request-list entry was built into an outgoing LSR.
    RequestSent(&'a NeighborNetId, &'a LsaKey),
    /// The request list emptied out: Loading -> Full.
    NeighborLoadingDone(NeighborNetId),
    /// An LSA instance was retransmitted after RxmtInterval elapsed
    /// unacknowledged.
    LsaRetransmit(&'a NeighborNetId, &'a LsaKey),
    /// The retransmission list emptied out and its timer was stopped.
    RetxTimerStopped(&'a NeighborNetId),
    /// The retransmission list hit `MaxPerNeighborLSAs`; inbound LSU
    /// processing for this neighbor is paused until it drains.
    RetxListFull(&'a NeighborNetId),
    /// A neighbor entry was torn down.
    NeighborDelete(NeighborNetId),
}

impl Debug<'_> {
    pub fn log(&self) {
        match self {
            Debug::PacketRx(nbr, pkt_type) => {
                debug_span!("packet", %nbr.router_id).in_scope(|| {
                    debug!(?pkt_type, "received packet");
                });
            }
            Debug::PacketTx(nbr, pkt_type) => {
                debug_span!("packet", %nbr.router_id).in_scope(|| {
                    debug!(?pkt_type, "sending packet");
                });
            }
            Debug::LsaInstall(nbr, key) => {
                debug!(%nbr.router_id, ?key, "installing LSA");
            }
            Debug::LsaDiscard(nbr, key, reason) => {
                debug!(%nbr.router_id, ?key, ?reason, "discarding LSA instance");
            }
            Debug::ImplicitAck(nbr, key) => {
                debug!(%nbr.router_id, ?key, "implicit acknowledgment");
            }
            Debug::UnexpectedAck(nbr, key) => {
                debug!(%nbr.router_id, ?key, "acknowledgment for instance not on retransmission list");
            }
            Debug::AckProcessed(nbr, key) => {
                debug!(%nbr.router_id, ?key, "acknowledgment processed");
            }
            Debug::RequestSent(nbr, key) => {
                debug!(%nbr.router_id, ?key, "sending link state request");
            }
            Debug::NeighborLoadingDone(net_id) => {
                debug!(%net_id.router_id, "request list empty, transitioning to Full");
            }
            Debug::LsaRetransmit(nbr, key) => {
                debug!(%nbr.router_id, ?key, "retransmitting unacknowledged LSA");
            }
            Debug::RetxTimerStopped(nbr) => {
                debug!(%nbr.router_id, "retransmission list empty, stopping timer");
            }
            Debug::RetxListFull(nbr) => {
                debug!(%nbr.router_id, "retransmission list full, pausing inbound update processing");
            }
            Debug::NeighborDelete(net_id) => {
                debug!(%net_id.router_id, "deleting neighbor");
            }
        }
    }
}
