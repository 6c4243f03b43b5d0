//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! The `Engine`: a single task owning the neighbor table and every channel
//! endpoint listed in §5, draining inbound packets and timer ticks through
//! one `tokio::select!` loop. Because exactly one task ever mutates a
//! neighbor's state, "single-writer-per-neighbor" holds without needing a
//! dedicated task per neighbor.

use std::net::Ipv4Addr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::warn;

use crate::ack_processor;
use crate::collections::{IntfKey, NeighborId, NeighborNetId, Neighbors};
use crate::config::Config;
use crate::debug::Debug;
use crate::error::Error;
use crate::flood::Flooder;
use crate::lsdb::LsdbClient;
use crate::neighbor::nsm;
use crate::output::{FramePort, IfaceType};
use crate::packet::error::DecodeError;
use crate::packet::{Packet, PacketType};
use crate::request_driver;
use crate::update_receiver::{self, UpdateContext};

/// Wakes the engine to run one RxmtInterval tick or delayed-ack flush for a
/// specific neighbor. Sent by that neighbor's own `IntervalTask`/
/// `TimeoutTask` callback rather than by a mutation reaching across task
/// boundaries.
pub use crate::neighbor::TimerTick;

/// IPv4-level metadata accompanying a raw OSPF payload, as handed off by
/// the (external) demuxer.
#[derive(Clone, Copy, Debug)]
pub struct IpHdrMeta {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
}

/// Interface-scoped facts the engine cannot derive on its own, since
/// interface/area configuration is owned outside this core.
#[derive(Clone, Copy, Debug)]
pub struct IfaceCtx {
    pub area_id: Ipv4Addr,
    pub broadcast: bool,
    pub we_are_dr_or_bdr: bool,
    pub iface_type: IfaceType,
    pub stub_area: bool,
}

/// One inbound OSPF payload, already demultiplexed from Hello/DBD traffic
/// by the caller.
#[derive(Clone, Debug)]
pub struct IngressPacket {
    pub raw: Bytes,
    pub ip: IpHdrMeta,
    pub iface: IntfKey,
    pub iface_ctx: IfaceCtx,
}

/// Owns the neighbor table and drives every LSA-phase exchange for one
/// OSPFv2 instance.
pub struct Engine {
    pub our_router_id: Ipv4Addr,
    pub config: Config,
    pub neighbors: Neighbors,
    pub lsdb: Arc<dyn LsdbClient>,
    pub flooder: Arc<dyn Flooder>,
    pub port: Arc<dyn FramePort>,
    timer_tx: mpsc::Sender<TimerTick>,
}

impl Engine {
    pub fn new(
        our_router_id: Ipv4Addr,
        config: Config,
        lsdb: Arc<dyn LsdbClient>,
        flooder: Arc<dyn Flooder>,
        port: Arc<dyn FramePort>,
        timer_tx: mpsc::Sender<TimerTick>,
    ) -> Engine {
        Engine {
            our_router_id,
            config,
            neighbors: Neighbors::default(),
            lsdb,
            flooder,
            port,
            timer_tx,
        }
    }

    /// Sender half of the timer channel this engine drains in [`Engine::run`].
    /// Handed to external callers (e.g. the owner of `build_and_send_request`)
    /// so neighbor-started retransmit/delayed-ack tasks can wake this loop.
    pub fn timer_tx(&self) -> mpsc::Sender<TimerTick> {
        self.timer_tx.clone()
    }

    /// Creates a neighbor entry once the FSM (owned elsewhere) has reached
    /// Exchange, per the documented lifecycle of `NeighborLsaState`.
    pub fn neighbor_enter_exchange(
        &mut self,
        iface: IntfKey,
        router_id: Ipv4Addr,
        area_id: Ipv4Addr,
    ) -> NeighborId {
        let (_idx, nbr) = self.neighbors.insert(iface, router_id, area_id);
        nbr.state = nsm::State::Exchange;
        nbr.id
    }

    /// Tears down a neighbor, e.g. on FSM transition back to a pre-Exchange
    /// state or adjacency death.
    pub fn neighbor_down(&mut self, id: NeighborId) {
        if let Some((idx, _)) = self.neighbors.get_by_id(id) {
            self.neighbors.delete(idx);
        }
    }

    /// Drains inbound packets and timer ticks until both channels close.
    pub async fn run(
        &mut self,
        mut ingress_rx: mpsc::Receiver<IngressPacket>,
        mut timer_rx: mpsc::Receiver<TimerTick>,
    ) {
        loop {
            tokio::select! {
                Some(pkt) = ingress_rx.recv() => {
                    self.handle_ingress(pkt);
                }
                Some(tick) = timer_rx.recv() => {
                    self.handle_timer_tick(tick);
                }
                else => break,
            }
        }
    }

    fn handle_ingress(&mut self, pkt: IngressPacket) {
        let packet = match Packet::decode(&pkt.raw) {
            Ok(packet) => packet,
            Err(decode_err) => {
                log_decode_error(pkt.iface, pkt.ip.src_ip, decode_err);
                return;
            }
        };

        let net_id = NeighborNetId {
            iface_key: pkt.iface,
            router_id: packet.hdr().router_id,
        };
        let Some((_idx, nbr)) = self.neighbors.get_mut_by_net_id(&net_id) else {
            Error::UnknownNeighbor(net_id.router_id).log();
            return;
        };

        let pkt_type = match &packet {
            Packet::LsRequest(_) => PacketType::LsRequest,
            Packet::LsUpdate(_) => PacketType::LsUpdate,
            Packet::LsAck(_) => PacketType::LsAck,
        };
        Debug::PacketRx(&nbr.net_id, pkt_type).log();

        let ctx = UpdateContext {
            our_router_id: self.our_router_id,
            area_id: pkt.iface_ctx.area_id,
            broadcast_iface: pkt.iface_ctx.broadcast,
            we_are_dr_or_bdr: pkt.iface_ctx.we_are_dr_or_bdr,
            dst_was_unicast: pkt.ip.dst_ip != crate::output::ALL_SPF_ROUTERS,
            stub_area: pkt.iface_ctx.stub_area,
            max_age_diff: self.config.max_age_diff.as_secs() as u16,
            max_per_neighbor_lsas: self.config.max_per_neighbor_lsas,
            delayed_ack_interval: self.config.delayed_ack_interval,
        };

        let result = match packet {
            Packet::LsRequest(req) => {
                request_driver::respond_to_request(
                    nbr,
                    pkt.iface_ctx.area_id,
                    self.our_router_id,
                    self.lsdb.as_ref(),
                    self.port.as_ref(),
                    req,
                    1,
                );
                Ok(())
            }
            Packet::LsUpdate(lsu) => update_receiver::process_update(
                nbr,
                &ctx,
                self.lsdb.as_ref(),
                self.flooder.as_ref(),
                self.port.as_ref(),
                self.timer_tx.clone(),
                lsu,
            ),
            Packet::LsAck(ack) => ack_processor::process_ack(nbr, ack),
        };

        if let Err(error) = result {
            error.log();
        } else {
            nbr.loading_done_check();
        }
    }

    fn handle_timer_tick(&mut self, tick: TimerTick) {
        match tick {
            TimerTick::Retransmit(id) => self.handle_retx_tick(id),
            TimerTick::DelayedAck(id) => self.handle_delayed_ack_tick(id),
        }
    }

    fn handle_retx_tick(&mut self, id: NeighborId) {
        let Some((idx, nbr)) = self.neighbors.get_mut_by_id(id) else {
            return;
        };
        let area_id = nbr.area_id;
        let result = crate::retx_timer::tick(
            nbr,
            self.lsdb.as_ref(),
            self.port.as_ref(),
            self.our_router_id,
            area_id,
            self.config.rxmt_interval,
            self.config.dead_interval,
            1,
        );
        if let Err(error) = result {
            error.log();
            if matches!(error, Error::NeighborDead(_)) {
                self.neighbors.delete(idx);
            }
        }
    }

    fn handle_delayed_ack_tick(&mut self, id: NeighborId) {
        let Some((_idx, nbr)) = self.neighbors.get_mut_by_id(id) else {
            return;
        };
        let iface_key = nbr.net_id.iface_key;
        let area_id = nbr.area_id;
        update_receiver::flush_delayed_acks(
            nbr,
            iface_key,
            self.our_router_id,
            area_id,
            self.port.as_ref(),
        );
        nbr.delayed_ack_stop();
    }
}

fn log_decode_error(iface: IntfKey, src_ip: Ipv4Addr, decode_err: DecodeError) {
    warn!(?iface, %src_ip, error = %decode_err, "failed to decode OSPF packet");
}
