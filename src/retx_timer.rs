//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Per-neighbor periodic retransmission of unacknowledged LSAs.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use crate::debug::Debug;
use crate::error::Error;
use crate::collections::NeighborKey;
use crate::lsdb::LsdbClient;
use crate::neighbor::Neighbor;
use crate::output::{self, FramePort};

/// Runs one `RxmtInterval` tick for `nbr`: re-sends every retransmission-
/// list entry due for a retry, drops entries the LSDB no longer has or
/// has aged out, and declares the neighbor dead if any entry has been
/// outstanding past `dead_interval`.
pub fn tick(
    nbr: &mut Neighbor,
    lsdb: &dyn LsdbClient,
    port: &dyn FramePort,
    router_id: Ipv4Addr,
    area_id: Ipv4Addr,
    rxmt_interval: Duration,
    dead_interval: Duration,
    transmit_delay: u16,
) -> Result<(), Error> {
    let now = Instant::now();
    let mut due = Vec::new();

    for entry in &mut nbr.lsa_state.retx_list {
        if now.duration_since(entry.first_sent_at) > dead_interval {
            return Err(Error::NeighborDead(NeighborKey::Value(nbr.net_id)));
        }
        if now.duration_since(entry.last_sent_at) >= rxmt_interval {
            due.push(entry.hdr.key());
            entry.last_sent_at = now;
        }
    }

    if due.is_empty() {
        return Ok(());
    }

    let mut lsas = Vec::with_capacity(due.len());
    for key in &due {
        match lsdb.get_lsa(area_id, key) {
            Some(lsa) if !lsa.hdr.is_maxage() => {
                Debug::LsaRetransmit(&nbr.net_id, key).log();
                lsas.push(lsa);
            }
            _ => {
                nbr.lsa_state.retx_list.retain(|e| &e.hdr.key() != key);
            }
        }
    }

    if !lsas.is_empty() {
        output::rxmt_lsupd(port, &nbr.net_id, router_id, area_id, lsas, transmit_delay);
    }

    if nbr.lsa_state.retx_list.is_empty() {
        Debug::RetxTimerStopped(&nbr.net_id).log();
    }
    nbr.rxmt_lsupd_stop_check();
    Ok(())
}
