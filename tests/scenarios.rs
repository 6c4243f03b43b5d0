//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! End-to-end scenarios driven against in-memory fakes of `LsdbClient`,
//! `Flooder` and `FramePort`, exercising the neighbor-facing entry points
//! directly rather than through the engine's async loop.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use ospf_lsync::collections::{IntfKey, NeighborKey, Neighbors};
use ospf_lsync::flood::Flooder;
use ospf_lsync::lsdb::{LsdbClient, LsdbRejectReason};
use ospf_lsync::neighbor::nsm;
use ospf_lsync::output::{FrameMsg, FramePort, IfaceType, SendDestination};
use ospf_lsync::packet::lsa::{
    Lsa, LsaBody, LsaHeader, LsaKey, LsaRouter, LsaRouterFlags, LsaTypeCode,
};
use ospf_lsync::packet::{LsUpdate, Options, PacketHdr, PacketType};
use ospf_lsync::request_driver;
use ospf_lsync::retx_timer;
use ospf_lsync::update_receiver::{self, UpdateContext};

const MAX_PER_NEIGHBOR_LSAS: usize = 1024;

fn timer_tx() -> tokio::sync::mpsc::Sender<ospf_lsync::neighbor::TimerTick> {
    tokio::sync::mpsc::channel(16).0
}

const OUR_ROUTER_ID: Ipv4Addr = Ipv4Addr::new(1, 1, 1, 1);
const NBR_ROUTER_ID: Ipv4Addr = Ipv4Addr::new(2, 2, 2, 2);
const AREA: Ipv4Addr = Ipv4Addr::new(0, 0, 0, 1);

#[derive(Default)]
struct FakeLsdb {
    lsas: Mutex<HashMap<LsaKey, Lsa>>,
    installs: Mutex<usize>,
    max_age_originated: Mutex<Vec<LsaKey>>,
}

impl FakeLsdb {
    fn with(lsa: Lsa) -> FakeLsdb {
        let lsdb = FakeLsdb::default();
        lsdb.lsas.lock().unwrap().insert(lsa.hdr.key(), lsa);
        lsdb
    }

    fn install_count(&self) -> usize {
        *self.installs.lock().unwrap()
    }
}

impl LsdbClient for FakeLsdb {
    fn get_lsa(&self, _area_id: Ipv4Addr, key: &LsaKey) -> Option<Lsa> {
        self.lsas.lock().unwrap().get(key).cloned()
    }

    fn install_lsa(
        &self,
        _area_id: Ipv4Addr,
        key: &LsaKey,
        lsa: Lsa,
    ) -> Result<(), LsdbRejectReason> {
        *self.installs.lock().unwrap() += 1;
        self.lsas.lock().unwrap().insert(*key, lsa);
        Ok(())
    }

    fn originate_max_age(&self, _area_id: Ipv4Addr, key: &LsaKey) {
        self.max_age_originated.lock().unwrap().push(*key);
    }
}

#[derive(Default)]
struct FakeFlooder {
    floods: Mutex<Vec<(NeighborKey, LsaKey)>>,
}

impl Flooder for FakeFlooder {
    fn flood(&self, ingress_nbr: NeighborKey, key: LsaKey, _raw: bytes::Bytes) {
        self.floods.lock().unwrap().push((ingress_nbr, key));
    }
}

#[derive(Default)]
struct FakePort {
    sent: Mutex<Vec<FrameMsg>>,
}

impl FramePort for FakePort {
    fn send(&self, frame: FrameMsg) {
        self.sent.lock().unwrap().push(frame);
    }
}

fn router_lsa(router: Ipv4Addr, seq_no: u32) -> Lsa {
    Lsa::new(
        LsaHeader::new(1, Options::E, LsaTypeCode::Router.into(), router, router, seq_no),
        LsaBody::Router(LsaRouter {
            flags: LsaRouterFlags::empty(),
            links: vec![],
        }),
    )
}

fn lsu_of(lsa: Lsa) -> LsUpdate {
    LsUpdate {
        hdr: PacketHdr {
            pkt_type: PacketType::LsUpdate,
            router_id: NBR_ROUTER_ID,
            area_id: AREA,
            auth_type: 0,
            auth: [0; 8],
        },
        lsas: vec![lsa],
    }
}

fn ctx() -> UpdateContext {
    UpdateContext {
        our_router_id: OUR_ROUTER_ID,
        area_id: AREA,
        broadcast_iface: false,
        we_are_dr_or_bdr: false,
        dst_was_unicast: true,
        stub_area: false,
        max_age_diff: 900,
        max_per_neighbor_lsas: MAX_PER_NEIGHBOR_LSAS,
        delayed_ack_interval: Duration::from_secs(1),
    }
}

fn new_neighbor(neighbors: &mut Neighbors) -> ospf_lsync::collections::NeighborId {
    let (_idx, nbr) = neighbors.insert(IntfKey(1), NBR_ROUTER_ID, AREA);
    nbr.state = nsm::State::Exchange;
    nbr.id
}

#[test]
fn normal_install_floods_and_queues_delayed_ack() {
    let mut neighbors = Neighbors::default();
    let id = new_neighbor(&mut neighbors);
    let (_idx, nbr) = neighbors.get_mut_by_id(id).unwrap();

    let lsdb = FakeLsdb::default();
    let flooder = FakeFlooder::default();
    let port = FakePort::default();

    let lsa = router_lsa(Ipv4Addr::new(9, 9, 9, 9), 0x8000_0001);
    update_receiver::process_update(nbr, &ctx(), &lsdb, &flooder, &port, timer_tx(), lsu_of(lsa))
        .expect("update accepted");

    assert_eq!(lsdb.install_count(), 1);
    assert_eq!(flooder.floods.lock().unwrap().len(), 1);
    assert_eq!(nbr.lsa_state.pending_ack_list.len(), 1);
    assert!(port.sent.lock().unwrap().is_empty());
}

#[test]
fn duplicate_update_installs_once_and_direct_acks_the_repeat() {
    let mut neighbors = Neighbors::default();
    let id = new_neighbor(&mut neighbors);
    let (_idx, nbr) = neighbors.get_mut_by_id(id).unwrap();

    let lsdb = FakeLsdb::default();
    let flooder = FakeFlooder::default();
    let port = FakePort::default();

    let lsa = router_lsa(Ipv4Addr::new(9, 9, 9, 9), 0x8000_0001);
    update_receiver::process_update(nbr, &ctx(), &lsdb, &flooder, &port, timer_tx(), lsu_of(lsa.clone()))
        .unwrap();
    update_receiver::process_update(nbr, &ctx(), &lsdb, &flooder, &port, timer_tx(), lsu_of(lsa)).unwrap();

    assert_eq!(lsdb.install_count(), 1);
    let sent = port.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        sent[0].dst,
        SendDestination::Unicast(addr) if addr == NBR_ROUTER_ID
    ));
}

#[test]
fn older_instance_is_rejected_and_our_copy_is_sent_back() {
    let mut neighbors = Neighbors::default();
    let id = new_neighbor(&mut neighbors);
    let (_idx, nbr) = neighbors.get_mut_by_id(id).unwrap();

    let adv_rtr = Ipv4Addr::new(9, 9, 9, 9);
    let fresh = router_lsa(adv_rtr, 0x8000_0005);
    let lsdb = FakeLsdb::with(fresh);
    let flooder = FakeFlooder::default();
    let port = FakePort::default();

    let stale = router_lsa(adv_rtr, 0x8000_0003);
    update_receiver::process_update(nbr, &ctx(), &lsdb, &flooder, &port, timer_tx(), lsu_of(stale)).unwrap();

    assert_eq!(lsdb.install_count(), 0);
    assert!(flooder.floods.lock().unwrap().is_empty());

    let sent = port.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let ospf_lsync::packet::Packet::LsUpdate(lsu) = &sent[0].packet else {
        panic!("expected LsUpdate");
    };
    assert_eq!(lsu.lsas[0].hdr.seq_no, 0x8000_0005);
}

#[test]
fn request_moves_to_retx_and_equal_reply_is_an_implicit_ack() {
    let mut neighbors = Neighbors::default();
    let id = new_neighbor(&mut neighbors);
    let (_idx, nbr) = neighbors.get_mut_by_id(id).unwrap();

    let adv_rtr = Ipv4Addr::new(9, 9, 9, 9);
    let wanted = router_lsa(adv_rtr, 0x8000_0001);
    nbr.lsa_state.enqueue_request(wanted.hdr, MAX_PER_NEIGHBOR_LSAS);

    let port = FakePort::default();
    let sent_count = request_driver::build_and_send_request(
        nbr,
        OUR_ROUTER_ID,
        AREA,
        &port,
        IfaceType::Broadcast,
        Duration::from_secs(5),
        MAX_PER_NEIGHBOR_LSAS,
        timer_tx(),
    );
    assert_eq!(sent_count, 1);
    assert_eq!(nbr.lsa_state.retx_list.len(), 1);
    assert!(nbr.lsa_state.request_list.is_empty());

    let sent = port.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let ospf_lsync::packet::Packet::LsRequest(req) = &sent[0].packet else {
        panic!("expected LsRequest");
    };
    assert_eq!(req.entries, vec![wanted.hdr.key()]);
    drop(sent);

    let lsdb = FakeLsdb::with(wanted.clone());
    let flooder = FakeFlooder::default();
    update_receiver::process_update(nbr, &ctx(), &lsdb, &flooder, &port, timer_tx(), lsu_of(wanted)).unwrap();

    assert!(nbr.lsa_state.retx_list.is_empty());
    assert_eq!(port.sent.lock().unwrap().len(), 1, "equal reply is an implicit ack, not a new send");
}

#[test]
fn retx_timer_resends_due_entries_and_updates_last_sent() {
    let mut neighbors = Neighbors::default();
    let id = new_neighbor(&mut neighbors);
    let (_idx, nbr) = neighbors.get_mut_by_id(id).unwrap();

    let adv_rtr = Ipv4Addr::new(9, 9, 9, 9);
    let lsa = router_lsa(adv_rtr, 0x8000_0001);
    let now = Instant::now();
    let stale_send = now - Duration::from_secs(20);
    nbr.lsa_state.retx_list.push(ospf_lsync::neighbor::RetxEntry {
        hdr: lsa.hdr,
        first_sent_at: stale_send,
        last_sent_at: stale_send,
    });

    let lsdb = FakeLsdb::with(lsa);
    let port = FakePort::default();

    retx_timer::tick(
        nbr,
        &lsdb,
        &port,
        OUR_ROUTER_ID,
        AREA,
        Duration::from_secs(5),
        Duration::from_secs(40),
        0,
    )
    .expect("neighbor not yet past dead interval");

    let sent = port.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let ospf_lsync::packet::Packet::LsUpdate(lsu) = &sent[0].packet else {
        panic!("expected LsUpdate");
    };
    assert_eq!(lsu.lsas[0].hdr.adv_rtr, adv_rtr);
    assert!(nbr.lsa_state.retx_list[0].last_sent_at > stale_send);
}

#[test]
fn neighbor_declared_dead_once_retx_outlives_dead_interval() {
    let mut neighbors = Neighbors::default();
    let id = new_neighbor(&mut neighbors);
    let (_idx, nbr) = neighbors.get_mut_by_id(id).unwrap();

    let lsa = router_lsa(Ipv4Addr::new(9, 9, 9, 9), 0x8000_0001);
    let now = Instant::now();
    let ancient = now - Duration::from_secs(100);
    nbr.lsa_state.retx_list.push(ospf_lsync::neighbor::RetxEntry {
        hdr: lsa.hdr,
        first_sent_at: ancient,
        last_sent_at: ancient,
    });

    let lsdb = FakeLsdb::with(lsa);
    let port = FakePort::default();

    let err = retx_timer::tick(
        nbr,
        &lsdb,
        &port,
        OUR_ROUTER_ID,
        AREA,
        Duration::from_secs(5),
        Duration::from_secs(40),
        0,
    )
    .unwrap_err();
    assert!(matches!(err, ospf_lsync::error::Error::NeighborDead(_)));
}

fn as_external_lsa(router: Ipv4Addr, seq_no: u32) -> Lsa {
    Lsa::new(
        LsaHeader::new(1, Options::E, LsaTypeCode::AsExternal.into(), router, router, seq_no),
        LsaBody::AsExternal(ospf_lsync::packet::lsa::LsaAsExternal {
            mask: Ipv4Addr::new(255, 255, 255, 0),
            flags: ospf_lsync::packet::lsa::LsaAsExternalFlags::empty(),
            metric: 10,
            fwd_addr: None,
            tag: 0,
        }),
    )
}

#[test]
fn as_external_lsa_rejected_on_stub_area() {
    let mut neighbors = Neighbors::default();
    let id = new_neighbor(&mut neighbors);
    let (_idx, nbr) = neighbors.get_mut_by_id(id).unwrap();

    let lsdb = FakeLsdb::default();
    let flooder = FakeFlooder::default();
    let port = FakePort::default();

    let mut stub_ctx = ctx();
    stub_ctx.stub_area = true;

    let lsa = as_external_lsa(Ipv4Addr::new(9, 9, 9, 9), 0x8000_0001);
    update_receiver::process_update(nbr, &stub_ctx, &lsdb, &flooder, &port, timer_tx(), lsu_of(lsa))
        .expect("packet accepted, LSA just dropped");

    assert_eq!(lsdb.install_count(), 0);
    assert!(flooder.floods.lock().unwrap().is_empty());
    assert!(nbr.lsa_state.pending_ack_list.is_empty());
}

#[test]
fn full_retx_list_pauses_inbound_update_processing() {
    let mut neighbors = Neighbors::default();
    let id = new_neighbor(&mut neighbors);
    let (_idx, nbr) = neighbors.get_mut_by_id(id).unwrap();

    let now = Instant::now();
    nbr.lsa_state.retx_list.push(ospf_lsync::neighbor::RetxEntry {
        hdr: router_lsa(Ipv4Addr::new(8, 8, 8, 8), 1).hdr,
        first_sent_at: now,
        last_sent_at: now,
    });

    let lsdb = FakeLsdb::default();
    let flooder = FakeFlooder::default();
    let port = FakePort::default();

    let mut tight_ctx = ctx();
    tight_ctx.max_per_neighbor_lsas = 1;

    let lsa = router_lsa(Ipv4Addr::new(9, 9, 9, 9), 0x8000_0001);
    update_receiver::process_update(nbr, &tight_ctx, &lsdb, &flooder, &port, timer_tx(), lsu_of(lsa))
        .unwrap();

    assert_eq!(lsdb.install_count(), 0, "retxList at capacity must gate inbound processing");
}

#[test]
fn request_on_numbered_p2p_multicasts_instead_of_unicast() {
    let mut neighbors = Neighbors::default();
    let id = new_neighbor(&mut neighbors);
    let (_idx, nbr) = neighbors.get_mut_by_id(id).unwrap();

    let wanted = router_lsa(Ipv4Addr::new(9, 9, 9, 9), 0x8000_0001);
    nbr.lsa_state.enqueue_request(wanted.hdr, MAX_PER_NEIGHBOR_LSAS);

    let port = FakePort::default();
    request_driver::build_and_send_request(
        nbr,
        OUR_ROUTER_ID,
        AREA,
        &port,
        IfaceType::NumberedP2P,
        Duration::from_secs(5),
        MAX_PER_NEIGHBOR_LSAS,
        timer_tx(),
    );

    let sent = port.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(matches!(
        sent[0].dst,
        SendDestination::Multicast(_, addr) if addr == ospf_lsync::output::ALL_SPF_ROUTERS
    ));
}
