//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Outbound framing: turns an LSR/LSU/LSAck `Packet` into a frame addressed
//! to either a single neighbor or an interface-wide multicast group, handed
//! off to whatever owns the raw socket.

use std::net::Ipv4Addr;

use crate::collections::{IntfKey, NeighborNetId};
use crate::debug::Debug;
use crate::packet::lsa::{Lsa, LsaHeader};
use crate::packet::{LsAck, LsRequest, LsUpdate, Packet, PacketHdr, PacketType};

/// The OSPF all-SPF-routers multicast address (224.0.0.5), used for direct
/// (non-delayed) acknowledgments on broadcast/NBMA networks.
pub const ALL_SPF_ROUTERS: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 5);

/// Where an outgoing frame should be sent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SendDestination {
    /// Directly to a single neighbor's address.
    Unicast(Ipv4Addr),
    /// To the interface's multicast group.
    Multicast(IntfKey, Ipv4Addr),
}

/// The network type of the interface a neighbor was learned on, as far as
/// this core needs to distinguish them: whether an LSR can be addressed to
/// AllSPFRouters instead of the neighbor's own address (RFC 2328 §10.9).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IfaceType {
    Broadcast,
    NumberedP2P,
    Other,
}

/// An outbound frame, ready to be handed to the link layer.
#[derive(Clone, Debug)]
pub struct FrameMsg {
    pub packet: Packet,
    pub dst: SendDestination,
}

/// The link-layer collaborator that owns the raw socket and interface MTU.
/// This core only ever produces fully encoded packets; splitting an LSU
/// across multiple packets to respect MTU is this trait's responsibility,
/// not this core's.
pub trait FramePort: Send + Sync {
    fn send(&self, frame: FrameMsg);
}

fn base_hdr(router_id: Ipv4Addr, area_id: Ipv4Addr, pkt_type: PacketType) -> PacketHdr {
    PacketHdr {
        pkt_type,
        router_id,
        area_id,
        auth_type: 0,
        auth: [0; 8],
    }
}

/// Builds and sends a Link State Request to `dst`, corresponding to the
/// entries `buildAndSendRequest` pulled off the neighbor's request list.
/// On a NumberedP2P interface the request goes to AllSPFRouters rather
/// than the neighbor's own address (RFC 2328 §10.9).
pub fn send_lsreq(
    port: &dyn FramePort,
    nbr: &NeighborNetId,
    router_id: Ipv4Addr,
    area_id: Ipv4Addr,
    entries: Vec<crate::packet::lsa::LsaKey>,
    iface_type: IfaceType,
) {
    let pkt = LsRequest {
        hdr: base_hdr(router_id, area_id, PacketType::LsRequest),
        entries,
    };
    Debug::PacketTx(nbr, PacketType::LsRequest).log();
    let dst = match iface_type {
        IfaceType::NumberedP2P => SendDestination::Multicast(nbr.iface_key, ALL_SPF_ROUTERS),
        IfaceType::Broadcast | IfaceType::Other => SendDestination::Unicast(nbr.router_id),
    };
    port.send(FrameMsg {
        packet: Packet::LsRequest(pkt),
        dst,
    });
}

/// Sends a Link State Update carrying `lsas` to `dst`. Each LSA's age is
/// bumped by `transmit_delay` (RFC 2328 §13.3) just before it goes out,
/// since this core does not run continuous wall-clock aging itself.
pub fn send_lsupd(
    port: &dyn FramePort,
    nbr: &NeighborNetId,
    router_id: Ipv4Addr,
    area_id: Ipv4Addr,
    dst: SendDestination,
    mut lsas: Vec<Lsa>,
    transmit_delay: u16,
) {
    for lsa in &mut lsas {
        let age = lsa.hdr.age.saturating_add(transmit_delay).min(crate::lsdb::LSA_MAX_AGE);
        lsa.set_age(age);
    }
    let pkt = LsUpdate {
        hdr: base_hdr(router_id, area_id, PacketType::LsUpdate),
        lsas,
    };
    Debug::PacketTx(nbr, PacketType::LsUpdate).log();
    port.send(FrameMsg {
        packet: Packet::LsUpdate(pkt),
        dst,
    });
}

/// Retransmits the LSAs currently on a neighbor's retransmission list,
/// unicast directly to it (RFC 2328 §13.3: retransmissions are never
/// multicast).
pub fn rxmt_lsupd(
    port: &dyn FramePort,
    nbr: &NeighborNetId,
    router_id: Ipv4Addr,
    area_id: Ipv4Addr,
    lsas: Vec<Lsa>,
    transmit_delay: u16,
) {
    send_lsupd(
        port,
        nbr,
        router_id,
        area_id,
        SendDestination::Unicast(nbr.router_id),
        lsas,
        transmit_delay,
    );
}

/// Sends an immediate (non-delayed) Link State Acknowledgment, used when
/// an LSA arrives that is not newer than what we hold and is not already
/// on our own retransmission list (RFC 2328 §13.5 direct ack case).
pub fn send_lsack_direct(
    port: &dyn FramePort,
    nbr: &NeighborNetId,
    router_id: Ipv4Addr,
    area_id: Ipv4Addr,
    lsa_hdrs: Vec<LsaHeader>,
) {
    let pkt = LsAck {
        hdr: base_hdr(router_id, area_id, PacketType::LsAck),
        lsa_hdrs,
    };
    Debug::PacketTx(nbr, PacketType::LsAck).log();
    port.send(FrameMsg {
        packet: Packet::LsAck(pkt),
        dst: SendDestination::Unicast(nbr.router_id),
    });
}

/// Flushes a neighbor's delayed-acknowledgment list as a single batched
/// LSAck, multicast to the interface's all-SPF-routers group.
pub fn send_lsack_delayed(
    port: &dyn FramePort,
    nbr: &NeighborNetId,
    iface_key: IntfKey,
    router_id: Ipv4Addr,
    area_id: Ipv4Addr,
    lsa_hdrs: Vec<LsaHeader>,
) {
    let pkt = LsAck {
        hdr: base_hdr(router_id, area_id, PacketType::LsAck),
        lsa_hdrs,
    };
    Debug::PacketTx(nbr, PacketType::LsAck).log();
    port.send(FrameMsg {
        packet: Packet::LsAck(pkt),
        dst: SendDestination::Multicast(iface_key, ALL_SPF_ROUTERS),
    });
}
