//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use bytes::Bytes;
use hex_literal::hex;
use internet_checksum::Checksum;
use ospf_lsync::packet::error::DecodeError;
use ospf_lsync::packet::lsa::{
    Lsa, LsaAsExternal, LsaAsExternalFlags, LsaBody, LsaHeader, LsaKey,
    LsaNetwork, LsaRouter, LsaRouterFlags, LsaRouterLink, LsaRouterLinkType,
    LsaSummary, LsaTypeCode,
};
use ospf_lsync::packet::{
    LsAck, LsRequest, LsUpdate, Options, Packet, PacketHdr, PacketType,
};

/// Re-derives the packet length and checksum fields after hand-truncating
/// an encoded packet, mirroring `packet_encode_end`'s own bookkeeping.
fn fix_length_and_checksum(buf: &mut [u8]) {
    let pkt_len = buf.len() as u16;
    buf[2..4].copy_from_slice(&pkt_len.to_be_bytes());
    buf[12..14].copy_from_slice(&[0, 0]);
    let mut cksum = Checksum::new();
    cksum.add_bytes(&buf[0..16]);
    cksum.add_bytes(&buf[24..]);
    buf[12..14].copy_from_slice(&cksum.checksum());
}

fn hdr(pkt_type: PacketType) -> PacketHdr {
    PacketHdr {
        pkt_type,
        router_id: Ipv4Addr::new(1, 1, 1, 1),
        area_id: Ipv4Addr::new(0, 0, 0, 1),
        auth_type: 0,
        auth: [0; 8],
    }
}

fn assert_packet_round_trips(packet: Packet) {
    let encoded = packet.encode();
    let decoded = Packet::decode(&encoded).expect("encoded packet must decode");
    assert_eq!(decoded, packet);
}

#[test]
fn lsrequest_round_trip_multiple_entries() {
    let pkt = LsRequest {
        hdr: hdr(PacketType::LsRequest),
        entries: vec![
            LsaKey::new(
                LsaTypeCode::Router.into(),
                Ipv4Addr::new(2, 2, 2, 2),
                Ipv4Addr::new(2, 2, 2, 2),
            ),
            LsaKey::new(
                LsaTypeCode::Network.into(),
                Ipv4Addr::new(3, 3, 3, 3),
                Ipv4Addr::new(10, 0, 0, 0),
            ),
        ],
    };
    assert_packet_round_trips(Packet::LsRequest(pkt));
}

#[test]
fn lsupdate_round_trip_all_body_types() {
    let router = Lsa::new(
        LsaHeader::new(
            1,
            Options::E,
            LsaTypeCode::Router.into(),
            Ipv4Addr::new(1, 1, 1, 1),
            Ipv4Addr::new(1, 1, 1, 1),
            0x8000_0001,
        ),
        LsaBody::Router(LsaRouter {
            flags: LsaRouterFlags::B,
            links: vec![LsaRouterLink {
                link_type: LsaRouterLinkType::PointToPoint,
                link_id: Ipv4Addr::new(10, 0, 0, 1),
                link_data: Ipv4Addr::new(255, 255, 255, 254),
                metric: 5,
            }],
        }),
    );
    let network = Lsa::new(
        LsaHeader::new(
            2,
            Options::E,
            LsaTypeCode::Network.into(),
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(1, 1, 1, 1),
            0x8000_0001,
        ),
        LsaBody::Network(LsaNetwork {
            mask: Ipv4Addr::new(255, 255, 255, 0),
            attached_rtrs: [Ipv4Addr::new(1, 1, 1, 1), Ipv4Addr::new(2, 2, 2, 2)]
                .into(),
        }),
    );
    let summary = Lsa::new(
        LsaHeader::new(
            3,
            Options::E,
            LsaTypeCode::SummaryNetwork.into(),
            Ipv4Addr::new(192, 168, 1, 0),
            Ipv4Addr::new(1, 1, 1, 1),
            0x8000_0001,
        ),
        LsaBody::SummaryNetwork(LsaSummary {
            mask: Ipv4Addr::new(255, 255, 255, 0),
            metric: 20,
        }),
    );
    let as_external = Lsa::new(
        LsaHeader::new(
            4,
            Options::E,
            LsaTypeCode::AsExternal.into(),
            Ipv4Addr::new(172, 16, 0, 0),
            Ipv4Addr::new(1, 1, 1, 1),
            0x8000_0001,
        ),
        LsaBody::AsExternal(LsaAsExternal {
            mask: Ipv4Addr::new(255, 255, 0, 0),
            flags: LsaAsExternalFlags::E,
            metric: 30,
            fwd_addr: Some(Ipv4Addr::new(10, 0, 0, 2)),
            tag: 100,
        }),
    );

    let pkt = LsUpdate {
        hdr: hdr(PacketType::LsUpdate),
        lsas: vec![router, network, summary, as_external],
    };
    assert_packet_round_trips(Packet::LsUpdate(pkt));
}

#[test]
fn lsack_round_trip_multiple_headers() {
    let pkt = LsAck {
        hdr: hdr(PacketType::LsAck),
        lsa_hdrs: vec![
            LsaHeader::new(
                5,
                Options::E,
                LsaTypeCode::Router.into(),
                Ipv4Addr::new(4, 4, 4, 4),
                Ipv4Addr::new(4, 4, 4, 4),
                0x8000_0001,
            ),
            LsaHeader::new(
                9,
                Options::E,
                LsaTypeCode::Network.into(),
                Ipv4Addr::new(5, 5, 5, 0),
                Ipv4Addr::new(4, 4, 4, 4),
                0x8000_0002,
            ),
        ],
    };
    assert_packet_round_trips(Packet::LsAck(pkt));
}

#[test]
fn truncated_common_header_is_malformed() {
    // Declares version 2 and type LsAck, but is cut off well before the
    // 24-byte common header ends.
    let raw = hex!("02 05 00 18 01 01 01 01");
    let err = Packet::decode(&raw).unwrap_err();
    assert!(matches!(err, DecodeError::TruncatedPacket));
}

#[test]
fn unsupported_version_is_rejected() {
    let mut raw = vec![0u8; PacketHdr::LENGTH as usize];
    raw[0] = 1; // version 1, never valid for OSPFv2
    raw[1] = PacketType::LsAck as u8;
    let err = Packet::decode(&raw).unwrap_err();
    assert!(matches!(err, DecodeError::InvalidVersion(1)));
}

#[test]
fn bit_flip_invalidates_fletcher_checksum() {
    let lsa = Lsa::new(
        LsaHeader::new(
            1,
            Options::empty(),
            LsaTypeCode::Router.into(),
            Ipv4Addr::new(6, 6, 6, 6),
            Ipv4Addr::new(6, 6, 6, 6),
            0x8000_0001,
        ),
        LsaBody::Router(LsaRouter {
            flags: LsaRouterFlags::empty(),
            links: vec![],
        }),
    );
    assert!(lsa.validate().is_ok());

    let mut corrupted = Bytes::copy_from_slice(&lsa.raw).to_vec();
    // Flip a body byte (past the 20-byte header) without touching age.
    corrupted[20] ^= 0xff;
    let mut buf = Bytes::from(corrupted);
    let decoded = Lsa::decode(&mut buf).unwrap();
    assert!(decoded.validate().is_err());
}

#[test]
fn lsupdate_with_trailing_malformed_lsa_yields_partial_list() {
    let first = Lsa::new(
        LsaHeader::new(
            1,
            Options::empty(),
            LsaTypeCode::Router.into(),
            Ipv4Addr::new(7, 7, 7, 7),
            Ipv4Addr::new(7, 7, 7, 7),
            0x8000_0001,
        ),
        LsaBody::Router(LsaRouter {
            flags: LsaRouterFlags::empty(),
            links: vec![],
        }),
    );
    let first_raw_len = first.raw.len();
    let second = Lsa::new(
        LsaHeader::new(
            1,
            Options::empty(),
            LsaTypeCode::Router.into(),
            Ipv4Addr::new(8, 8, 8, 8),
            Ipv4Addr::new(8, 8, 8, 8),
            0x8000_0001,
        ),
        LsaBody::Router(LsaRouter {
            flags: LsaRouterFlags::empty(),
            links: vec![LsaRouterLink {
                link_type: LsaRouterLinkType::PointToPoint,
                link_id: Ipv4Addr::new(10, 0, 0, 1),
                link_data: Ipv4Addr::new(255, 255, 255, 254),
                metric: 5,
            }],
        }),
    );

    let pkt = LsUpdate {
        hdr: hdr(PacketType::LsUpdate),
        lsas: vec![first, second],
    };
    let encoded = Packet::LsUpdate(pkt).encode();

    // Keep the common header, the lsaCount field, the first complete LSA,
    // and 8 trailing bytes: not enough for the second LSA's 20-byte header.
    let keep = PacketHdr::LENGTH as usize + 4 + first_raw_len + 8;
    let mut raw = encoded[..keep].to_vec();
    fix_length_and_checksum(&mut raw);

    let decoded = Packet::decode(&raw).expect("partial LSU still decodes");
    let Packet::LsUpdate(lsu) = decoded else {
        panic!("expected LsUpdate");
    };
    assert_eq!(lsu.lsas.len(), 1);
    assert_eq!(lsu.lsas[0].hdr.adv_rtr, Ipv4Addr::new(7, 7, 7, 7));
}
