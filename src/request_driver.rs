//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Builds and sends Link State Requests off a neighbor's request list,
//! advancing the cursor as entries are consumed.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::Sender;

use crate::debug::Debug;
use crate::lsdb::LsdbClient;
use crate::neighbor::{nsm, Neighbor, TimerTick};
use crate::output::{self, FramePort, IfaceType};
use crate::packet::LsRequest;

/// Maximum number of entries bundled into a single LSR, mirroring the
/// batching `send_lsupd` does for updates.
const MAX_ENTRIES_PER_REQUEST: usize = 64;

/// Pulls the next batch of outstanding entries off `nbr`'s request list and
/// sends them as a single LSR. Each included entry is tombstoned in the
/// request list and moved onto the retransmission list before the send
/// completes, since asking for an LSA immediately obligates us to expect
/// (and retry) that ask.
///
/// Returns the number of entries sent (zero if the request list is
/// already exhausted, in which case the caller should check
/// [`Neighbor::loading_done_check`]).
#[allow(clippy::too_many_arguments)]
pub fn build_and_send_request(
    nbr: &mut Neighbor,
    router_id: Ipv4Addr,
    area_id: Ipv4Addr,
    port: &dyn FramePort,
    iface_type: IfaceType,
    rxmt_interval: Duration,
    max_per_neighbor_lsas: usize,
    timer_tx: Sender<TimerTick>,
) -> usize {
    debug_assert!(nbr.state >= nsm::State::Exchange);

    // Never request more than retxList has room for: every request sent
    // immediately moves onto the retransmission list.
    let retx_room = max_per_neighbor_lsas.saturating_sub(nbr.lsa_state.retx_list.len());
    if retx_room == 0 {
        return 0;
    }

    let start = nbr.lsa_state.request_cursor.min(nbr.lsa_state.request_list.len());
    let batch = MAX_ENTRIES_PER_REQUEST.min(retx_room);
    let end = (start + batch).min(nbr.lsa_state.request_list.len());

    let now = Instant::now();
    let mut sent_hdrs = Vec::with_capacity(end - start);
    for entry in &mut nbr.lsa_state.request_list[start..end] {
        if entry.valid {
            sent_hdrs.push(entry.hdr);
            entry.valid = false;
        }
    }
    if sent_hdrs.is_empty() {
        return 0;
    }

    nbr.lsa_state.request_cursor = end;

    let mut keys = Vec::with_capacity(sent_hdrs.len());
    for hdr in sent_hdrs {
        let key = hdr.key();
        if !nbr.lsa_state.move_to_retx(hdr, now, max_per_neighbor_lsas) {
            break;
        }
        Debug::RequestSent(&nbr.net_id, &key).log();
        keys.push(key);
    }

    if keys.is_empty() {
        nbr.lsa_state.compact_request_list();
        return 0;
    }

    let sent = keys.len();
    output::send_lsreq(port, &nbr.net_id, router_id, area_id, keys, iface_type);
    nbr.rxmt_lsreq_start(rxmt_interval, timer_tx.clone());
    nbr.rxmt_lsupd_start_check(rxmt_interval, timer_tx);

    nbr.lsa_state.compact_request_list();

    sent
}

/// Answers an inbound Link State Request: for each requested `LsaId`,
/// fetches the current instance from the LSDB and bundles whatever is
/// found into a single unicast Link State Update. Missing entries are
/// simply omitted, matching RFC 2328's tolerance of a request racing
/// against a database change.
pub fn respond_to_request(
    nbr: &Neighbor,
    area_id: Ipv4Addr,
    router_id: Ipv4Addr,
    lsdb: &dyn LsdbClient,
    port: &dyn FramePort,
    req: LsRequest,
    transmit_delay: u16,
) {
    let mut lsas = Vec::with_capacity(req.entries.len());
    for key in &req.entries {
        if let Some(lsa) = lsdb.get_lsa(area_id, key) {
            lsas.push(lsa);
        }
    }
    if lsas.is_empty() {
        return;
    }
    output::send_lsupd(
        port,
        &nbr.net_id,
        router_id,
        area_id,
        crate::output::SendDestination::Unicast(nbr.net_id.router_id),
        lsas,
        transmit_delay,
    );
}
