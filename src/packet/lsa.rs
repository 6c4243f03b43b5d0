//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! LSA header, bodies and the RFC 2328 freshness comparator.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use bitflags::bitflags;
use bytes::{Buf, Bytes, BytesMut};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::lsdb::{LSA_MAX_AGE, LSA_RESERVED_SEQ_NO};
use crate::packet::bytes_ext::{BytesExt, BytesMutExt};
use crate::packet::error::{DecodeError, DecodeResult, LsaValidationError};
use crate::packet::Options;

/// The 8-bit LSA type code as it appears on the wire.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct LsaType(pub u8);

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
pub enum LsaTypeCode {
    Router = 1,
    Network = 2,
    SummaryNetwork = 3,
    SummaryRouter = 4,
    AsExternal = 5,
}

impl LsaType {
    pub fn type_code(&self) -> Option<LsaTypeCode> {
        LsaTypeCode::from_u8(self.0)
    }
}

impl std::fmt::Display for LsaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<LsaTypeCode> for LsaType {
    fn from(code: LsaTypeCode) -> LsaType {
        LsaType(code as u8)
    }
}

/// Global identity of an LSA instance: used both as the key under which the
/// LSDB stores the latest instance, and as the entries carried in LSR/LSAck
/// bodies.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct LsaKey {
    pub lsa_type: LsaType,
    pub adv_rtr: Ipv4Addr,
    pub lsa_id: Ipv4Addr,
}

impl LsaKey {
    pub fn new(lsa_type: LsaType, adv_rtr: Ipv4Addr, lsa_id: Ipv4Addr) -> Self {
        LsaKey {
            lsa_type,
            adv_rtr,
            lsa_id,
        }
    }
}

//
// OSPFv2 LSA header.
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |            LS age             |    Options    |    LS type    |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                        Link State ID                          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                     Advertising Router                        |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                     LS sequence number                        |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |         LS checksum           |             length            |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LsaHeader {
    pub age: u16,
    pub options: Options,
    pub lsa_type: LsaType,
    pub lsa_id: Ipv4Addr,
    pub adv_rtr: Ipv4Addr,
    pub seq_no: u32,
    pub cksum: u16,
    pub length: u16,
}

impl LsaHeader {
    pub const LENGTH: u16 = 20;

    pub fn new(
        age: u16,
        options: Options,
        lsa_type: LsaType,
        lsa_id: Ipv4Addr,
        adv_rtr: Ipv4Addr,
        seq_no: u32,
    ) -> Self {
        LsaHeader {
            age,
            options,
            lsa_type,
            lsa_id,
            adv_rtr,
            seq_no,
            cksum: 0,
            length: 0,
        }
    }

    pub fn key(&self) -> LsaKey {
        LsaKey::new(self.lsa_type, self.adv_rtr, self.lsa_id)
    }

    pub fn is_maxage(&self) -> bool {
        self.age >= LSA_MAX_AGE
    }

    pub fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        if buf.remaining() < Self::LENGTH as usize {
            return Err(DecodeError::TruncatedPacket);
        }
        let age = buf.get_u16();
        let options = Options::from_bits_truncate(buf.get_u8());
        let lsa_type = LsaType(buf.get_u8());
        let lsa_id = buf.get_ipv4();
        let adv_rtr = buf.get_ipv4();
        let seq_no = buf.get_u32();
        let cksum = buf.get_u16();
        let length = buf.get_u16();

        Ok(LsaHeader {
            age,
            options,
            lsa_type,
            lsa_id,
            adv_rtr,
            seq_no,
            cksum,
            length,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16(self.age);
        buf.put_u8(self.options.bits());
        buf.put_u8(self.lsa_type.0);
        buf.put_ipv4(&self.lsa_id);
        buf.put_ipv4(&self.adv_rtr);
        buf.put_u32(self.seq_no);
        buf.put_u16(self.cksum);
        buf.put_u16(self.length);
    }
}

/// A fully decoded LSA: header, typed body, and the exact raw bytes it was
/// parsed from (or will be re-transmitted as).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Lsa {
    pub raw: Bytes,
    pub hdr: LsaHeader,
    pub body: LsaBody,
}

impl Lsa {
    /// Builds a fresh LSA from a header and body, computing length and
    /// checksum and freezing the encoded representation.
    pub fn new(hdr: LsaHeader, body: LsaBody) -> Self {
        let mut lsa = Lsa {
            raw: Bytes::new(),
            hdr,
            body,
        };
        lsa.encode();
        lsa
    }

    /// Decodes a single LSA (header + type-specific body) from `buf`,
    /// trusting the header's declared `length` to bound the body and never
    /// reading past it.
    pub fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        let buf_orig = buf.clone();
        if buf.remaining() < LsaHeader::LENGTH as usize {
            return Err(DecodeError::TruncatedPacket);
        }
        let hdr = LsaHeader::decode(buf)?;
        let lsa_len = hdr.length;
        if lsa_len < LsaHeader::LENGTH {
            return Err(DecodeError::InvalidLsaLength);
        }
        let body_len = lsa_len - LsaHeader::LENGTH;
        if buf.remaining() < body_len as usize {
            return Err(DecodeError::InvalidLsaLength);
        }
        let mut buf_body = buf.copy_to_bytes(body_len as usize);
        let body = LsaBody::decode(hdr.lsa_type, &mut buf_body)?;

        Ok(Lsa {
            raw: buf_orig.slice(0..lsa_len as usize),
            hdr,
            body,
        })
    }

    fn encode(&mut self) {
        let mut buf = BytesMut::new();
        self.hdr.encode(&mut buf);
        self.body.encode(&mut buf);

        let lsa_len = buf.len() as u16;
        buf[18..20].copy_from_slice(&lsa_len.to_be_bytes());
        self.hdr.length = lsa_len;

        let cksum = Self::checksum(&buf[2..(lsa_len as usize)]);
        buf[16..18].copy_from_slice(&cksum);
        self.hdr.cksum = u16::from_be_bytes(cksum);

        self.raw = buf.freeze();
    }

    /// Re-encodes the LSA after `set_age` has mutated the header in place,
    /// without touching length or checksum (both are age-independent).
    pub fn set_age(&mut self, age: u16) {
        self.hdr.age = age;
        let mut raw = BytesMut::from(self.raw.as_ref());
        raw[0..2].copy_from_slice(&age.to_be_bytes());
        self.raw = raw.freeze();
    }

    pub fn validate(&self) -> Result<(), LsaValidationError> {
        if !self.is_checksum_valid() {
            return Err(LsaValidationError::InvalidChecksum);
        }
        self.body.validate(&self.hdr)
    }

    fn is_checksum_valid(&self) -> bool {
        fletcher::calc_fletcher16(&self.raw[2..(self.hdr.length as usize)]) == 0
    }

    /// Fletcher-16 over the whole LSA except the 2-byte age field, with the
    /// holo checkbyte-rescaling algorithm used to compute a checksum that
    /// *writes* a valid value (as opposed to `is_checksum_valid`, which only
    /// needs to confirm the running sum is zero).
    fn checksum(data: &[u8]) -> [u8; 2] {
        let checksum = fletcher::calc_fletcher16(data);
        let mut checkbyte0 = (checksum & 0x00FF) as i32;
        let mut checkbyte1 = ((checksum >> 8) & 0x00FF) as i32;

        let sop = data.len() as u16 - 15;
        let mut x = (sop as i32 * checkbyte0 - checkbyte1) % 255;
        if x <= 0 {
            x += 255;
        }
        checkbyte1 = 510 - checkbyte0 - x;
        if checkbyte1 > 255 {
            checkbyte1 -= 255;
        }
        checkbyte0 = x;
        [checkbyte0 as u8, checkbyte1 as u8]
    }
}

/// Typed LSA body, one variant per supported LSA type plus an opaque
/// catch-all for unsupported type codes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LsaBody {
    Router(LsaRouter),
    Network(LsaNetwork),
    SummaryNetwork(LsaSummary),
    SummaryRouter(LsaSummary),
    AsExternal(LsaAsExternal),
    Unknown(LsaUnknown),
}

impl LsaBody {
    pub fn decode(lsa_type: LsaType, buf: &mut Bytes) -> DecodeResult<Self> {
        let body = match lsa_type.type_code() {
            Some(LsaTypeCode::Router) => LsaBody::Router(LsaRouter::decode(buf)?),
            Some(LsaTypeCode::Network) => {
                LsaBody::Network(LsaNetwork::decode(buf)?)
            }
            Some(LsaTypeCode::SummaryNetwork) => {
                LsaBody::SummaryNetwork(LsaSummary::decode(buf)?)
            }
            Some(LsaTypeCode::SummaryRouter) => {
                LsaBody::SummaryRouter(LsaSummary::decode(buf)?)
            }
            Some(LsaTypeCode::AsExternal) => {
                LsaBody::AsExternal(LsaAsExternal::decode(buf)?)
            }
            None => LsaBody::Unknown(LsaUnknown::decode(buf)?),
        };
        Ok(body)
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            LsaBody::Router(lsa) => lsa.encode(buf),
            LsaBody::Network(lsa) => lsa.encode(buf),
            LsaBody::SummaryNetwork(lsa) => lsa.encode(buf),
            LsaBody::SummaryRouter(lsa) => lsa.encode(buf),
            LsaBody::AsExternal(lsa) => lsa.encode(buf),
            LsaBody::Unknown(lsa) => lsa.encode(buf),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, LsaBody::Unknown(_))
    }

    fn validate(&self, hdr: &LsaHeader) -> Result<(), LsaValidationError> {
        match self {
            LsaBody::Router(lsa) => lsa.validate(hdr),
            _ => Ok(()),
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct LsaRouterFlags: u8 {
        const B = 0x01;
        const E = 0x02;
        const V = 0x04;
        const NT = 0x10;
    }
}

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
pub enum LsaRouterLinkType {
    PointToPoint = 0x01,
    TransitNetwork = 0x02,
    StubNetwork = 0x03,
    VirtualLink = 0x04,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LsaRouterLink {
    pub link_type: LsaRouterLinkType,
    pub link_id: Ipv4Addr,
    pub link_data: Ipv4Addr,
    pub metric: u16,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LsaRouter {
    pub flags: LsaRouterFlags,
    pub links: Vec<LsaRouterLink>,
}

impl LsaRouter {
    pub const BASE_LENGTH: u16 = 4;

    fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        if buf.remaining() < Self::BASE_LENGTH as usize {
            return Err(DecodeError::InvalidLsaLength);
        }
        let flags = LsaRouterFlags::from_bits_truncate(buf.get_u8());
        let _ = buf.get_u8();
        let links_cnt = buf.get_u16();

        let mut links = vec![];
        for _ in 0..links_cnt {
            if buf.remaining() < 12 {
                return Err(DecodeError::InvalidLsaLength);
            }
            let link_id = buf.get_ipv4();
            let link_data = buf.get_ipv4();
            let link_type = buf.get_u8();
            let link_type = LsaRouterLinkType::from_u8(link_type)
                .ok_or(DecodeError::InvalidLsaLength)?;
            let num_tos = buf.get_u8();
            let metric = buf.get_u16();

            // Deprecated per-TOS metrics: parsed past and discarded.
            for _ in 0..num_tos {
                if buf.remaining() < 4 {
                    return Err(DecodeError::InvalidLsaLength);
                }
                let _ = buf.get_u32();
            }

            links.push(LsaRouterLink {
                link_type,
                link_id,
                link_data,
                metric,
            });
        }

        Ok(LsaRouter { flags, links })
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.flags.bits());
        buf.put_u8(0);
        buf.put_u16(self.links.len() as u16);
        for link in &self.links {
            buf.put_ipv4(&link.link_id);
            buf.put_ipv4(&link.link_data);
            buf.put_u8(link.link_type as u8);
            buf.put_u8(0);
            buf.put_u16(link.metric);
        }
    }

    fn validate(&self, hdr: &LsaHeader) -> Result<(), LsaValidationError> {
        if hdr.adv_rtr != hdr.lsa_id {
            return Err(LsaValidationError::Ospfv2RouterLsaIdMismatch);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LsaNetwork {
    pub mask: Ipv4Addr,
    pub attached_rtrs: BTreeSet<Ipv4Addr>,
}

impl LsaNetwork {
    pub const BASE_LENGTH: u16 = 4;

    fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        if buf.remaining() < Self::BASE_LENGTH as usize {
            return Err(DecodeError::InvalidLsaLength);
        }
        let mask = buf.get_ipv4();

        let mut attached_rtrs = BTreeSet::new();
        let rtrs_cnt = buf.remaining() / 4;
        for _ in 0..rtrs_cnt {
            attached_rtrs.insert(buf.get_ipv4());
        }

        Ok(LsaNetwork { mask, attached_rtrs })
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_ipv4(&self.mask);
        for rtr in &self.attached_rtrs {
            buf.put_ipv4(rtr);
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LsaSummary {
    pub mask: Ipv4Addr,
    pub metric: u32,
}

impl LsaSummary {
    pub const BASE_LENGTH: u16 = 8;

    fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        if buf.remaining() < Self::BASE_LENGTH as usize {
            return Err(DecodeError::InvalidLsaLength);
        }
        let mask = buf.get_ipv4();
        let _ = buf.get_u8();
        let metric = buf.get_u24();
        // Deprecated per-TOS metrics, if present, are simply not parsed:
        // the metric field above is all this core needs.

        Ok(LsaSummary { mask, metric })
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_ipv4(&self.mask);
        buf.put_u8(0);
        buf.put_u24(self.metric);
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct LsaAsExternalFlags: u8 {
        const E = 0x80;
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LsaAsExternal {
    pub mask: Ipv4Addr,
    pub flags: LsaAsExternalFlags,
    pub metric: u32,
    pub fwd_addr: Option<Ipv4Addr>,
    pub tag: u32,
}

impl LsaAsExternal {
    pub const BASE_LENGTH: u16 = 16;

    fn decode(buf: &mut Bytes) -> DecodeResult<Self> {
        if buf.remaining() < Self::BASE_LENGTH as usize {
            return Err(DecodeError::InvalidLsaLength);
        }
        let mask = buf.get_ipv4();
        let flags = LsaAsExternalFlags::from_bits_truncate(buf.get_u8());
        let metric = buf.get_u24();
        let fwd_addr = buf.get_opt_ipv4();
        let tag = buf.get_u32();

        Ok(LsaAsExternal {
            mask,
            flags,
            metric,
            fwd_addr,
            tag,
        })
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_ipv4(&self.mask);
        buf.put_u8(self.flags.bits());
        buf.put_u24(self.metric);
        buf.put_ipv4(&self.fwd_addr.unwrap_or(Ipv4Addr::UNSPECIFIED));
        buf.put_u32(self.tag);
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LsaUnknown {}

impl LsaUnknown {
    fn decode(_buf: &mut Bytes) -> DecodeResult<Self> {
        Ok(LsaUnknown {})
    }

    fn encode(&self, _buf: &mut BytesMut) {}
}

/// Compares which LSA instance is more recent, per RFC 2328 §13.1.
///
/// Returns `Greater` when `a` is more recent, `Less` when `b` is, and
/// `Equal` when the two are considered duplicates of each other.
/// `max_age_diff` is `Config::max_age_diff` in seconds (RFC 2328's
/// `MaxAgeDiff`, 900s by default, not hardcoded here so deployments or
/// tests can narrow it).
pub fn lsa_compare(a: &LsaHeader, b: &LsaHeader, max_age_diff: u16) -> Ordering {
    let a_seq_no = a.seq_no as i32;
    let b_seq_no = b.seq_no as i32;
    let cmp = a_seq_no.cmp(&b_seq_no);
    if cmp != Ordering::Equal {
        return cmp;
    }

    let cmp = a.cksum.cmp(&b.cksum);
    if cmp != Ordering::Equal {
        return cmp;
    }

    if a.is_maxage() && !b.is_maxage() {
        return Ordering::Greater;
    } else if !a.is_maxage() && b.is_maxage() {
        return Ordering::Less;
    }

    if a.age.abs_diff(b.age) > max_age_diff {
        return b.age.cmp(&a.age);
    }

    Ordering::Equal
}

/// Age-and-basic-sanity validation shared by both the header-only (LSAck)
/// and full-LSA decode paths.
pub fn validate_seq_no(seq_no: u32) -> Result<(), LsaValidationError> {
    if seq_no == LSA_RESERVED_SEQ_NO {
        return Err(LsaValidationError::InvalidChecksum);
    }
    Ok(())
}
