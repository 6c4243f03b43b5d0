//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Parses inbound Link State Updates and runs the RFC 2328 §13 "which
//! instance is newer" decision tree against the LSDB, dispatching
//! installs, floods and acknowledgments.

use std::cmp::Ordering;
use std::net::Ipv4Addr;
use std::time::Duration;

use tokio::sync::mpsc::Sender;

use crate::collections::NeighborKey;
use crate::debug::Debug;
use crate::error::Error;
use crate::flood::Flooder;
use crate::lsdb::{LsdbClient, LsdbRejectReason};
use crate::neighbor::{Neighbor, TimerTick};
use crate::output::{self, FramePort, SendDestination};
use crate::packet::lsa::{lsa_compare, Lsa, LsaTypeCode};
use crate::packet::LsUpdate;

/// Interface-scoped facts UpdateReceiver needs to pick between a direct
/// and a delayed acknowledgment, reject LSAs arriving in the wrong area,
/// and enforce the per-neighbor resource bounds. Supplied by the
/// (external) FSM/interface owner.
#[derive(Clone, Copy, Debug)]
pub struct UpdateContext {
    pub our_router_id: Ipv4Addr,
    pub area_id: Ipv4Addr,
    pub broadcast_iface: bool,
    pub we_are_dr_or_bdr: bool,
    pub dst_was_unicast: bool,
    /// Whether the neighbor's interface belongs to a stub area: AS-External
    /// LSAs are rejected there per RFC 2328 §3.6.
    pub stub_area: bool,
    pub max_age_diff: u16,
    pub max_per_neighbor_lsas: usize,
    pub delayed_ack_interval: Duration,
}

/// Processes one inbound Link State Update. Corresponds to the contract
/// `processUpdate(nbrKey, payload)`.
pub fn process_update(
    nbr: &mut Neighbor,
    ctx: &UpdateContext,
    lsdb: &dyn LsdbClient,
    flooder: &dyn Flooder,
    port: &dyn FramePort,
    timer_tx: Sender<TimerTick>,
    lsu: LsUpdate,
) -> Result<(), Error> {
    if !nbr.state.accepts_lsa_phase_packets() {
        return Err(Error::WrongAdjacencyState(
            NeighborKey::Value(nbr.net_id),
            nbr.state,
        ));
    }

    if lsu.hdr.area_id != ctx.area_id {
        return Ok(());
    }

    let mut direct_ack_hdrs = Vec::new();

    for lsa in lsu.lsas {
        // retxList overflow backpressures the whole neighbor: stop
        // draining this (and any further) LSU until rxmt/acks free room.
        if nbr.lsa_state.retx_list.len() >= ctx.max_per_neighbor_lsas {
            Debug::RetxListFull(&nbr.net_id).log();
            break;
        }

        if lsa.validate().is_err() {
            continue;
        }
        if lsa.body.is_unknown() {
            continue;
        }

        if ctx.stub_area && lsa.hdr.lsa_type.type_code() == Some(LsaTypeCode::AsExternal) {
            Debug::LsaDiscard(&nbr.net_id, &lsa.hdr.key(), LsdbRejectReason::NotAccepted).log();
            continue;
        }

        if lsa.hdr.adv_rtr == ctx.our_router_id {
            let key = lsa.hdr.key();
            let local = lsdb.get_lsa(ctx.area_id, &key);
            let stale = match &local {
                None => true,
                Some(local) => lsa_compare(&lsa.hdr, &local.hdr, ctx.max_age_diff) == Ordering::Greater,
            };
            if stale {
                lsdb.originate_max_age(ctx.area_id, &key);
            }
            continue;
        }

        handle_lsa(nbr, ctx, lsdb, flooder, port, timer_tx.clone(), lsa, &mut direct_ack_hdrs);
    }

    if !direct_ack_hdrs.is_empty() {
        output::send_lsack_direct(
            port,
            &nbr.net_id,
            ctx.our_router_id,
            ctx.area_id,
            direct_ack_hdrs,
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_lsa(
    nbr: &mut Neighbor,
    ctx: &UpdateContext,
    lsdb: &dyn LsdbClient,
    flooder: &dyn Flooder,
    port: &dyn FramePort,
    timer_tx: Sender<TimerTick>,
    lsa: Lsa,
    direct_ack_hdrs: &mut Vec<crate::packet::lsa::LsaHeader>,
) {
    let key = lsa.hdr.key();
    let local = lsdb.get_lsa(ctx.area_id, &key);

    let cmp = match &local {
        None => Ordering::Greater,
        Some(local) => lsa_compare(&lsa.hdr, &local.hdr, ctx.max_age_diff),
    };

    match cmp {
        Ordering::Greater => {
            if local.is_none() && lsa.hdr.is_maxage() {
                Debug::LsaDiscard(
                    &nbr.net_id,
                    &key,
                    crate::lsdb::LsdbRejectReason::NotAccepted,
                )
                .log();
                direct_ack_hdrs.push(lsa.hdr);
                return;
            }

            match lsdb.install_lsa(ctx.area_id, &key, lsa.clone()) {
                Ok(()) => {
                    Debug::LsaInstall(&nbr.net_id, &key).log();
                    flooder.flood(NeighborKey::Value(nbr.net_id), key, lsa.raw.clone());
                }
                Err(reason) => {
                    Debug::LsaDiscard(&nbr.net_id, &key, reason).log();
                }
            }

            if ctx.broadcast_iface && !ctx.we_are_dr_or_bdr && ctx.dst_was_unicast {
                direct_ack_hdrs.push(lsa.hdr);
            } else {
                nbr.lsa_state.push_pending_ack(lsa.hdr, ctx.max_per_neighbor_lsas);
                nbr.delayed_ack_start_check(ctx.delayed_ack_interval, timer_tx);
            }
        }
        Ordering::Equal => {
            if nbr.lsa_state.is_on_retx(&key) {
                nbr.lsa_state.remove_from_retx(&lsa.hdr);
                Debug::ImplicitAck(&nbr.net_id, &key).log();
            } else {
                Debug::LsaDiscard(
                    &nbr.net_id,
                    &key,
                    crate::lsdb::LsdbRejectReason::Superseded,
                )
                .log();
                direct_ack_hdrs.push(lsa.hdr);
            }
        }
        Ordering::Less => {
            Debug::LsaDiscard(&nbr.net_id, &key, crate::lsdb::LsdbRejectReason::Superseded)
                .log();
            if let Some(local) = local {
                output::send_lsupd(
                    port,
                    &nbr.net_id,
                    ctx.our_router_id,
                    ctx.area_id,
                    SendDestination::Unicast(nbr.net_id.router_id),
                    vec![local],
                    0,
                );
            }
        }
    }
}

/// Flushes a neighbor's accumulated delayed-ack list, emitting a single
/// batched LSAck once `DelayedAckInterval` has elapsed. Driven by the
/// engine's own delayed-ack timer, not by `process_update` itself.
pub fn flush_delayed_acks(
    nbr: &mut Neighbor,
    iface_key: crate::collections::IntfKey,
    router_id: Ipv4Addr,
    area_id: Ipv4Addr,
    port: &dyn FramePort,
) {
    if nbr.lsa_state.pending_ack_list.is_empty() {
        return;
    }
    let hdrs = std::mem::take(&mut nbr.lsa_state.pending_ack_list);
    output::send_lsack_delayed(port, &nbr.net_id, iface_key, router_id, area_id, hdrs);
}
