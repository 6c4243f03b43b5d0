//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! OSPFv2 neighbor link-state synchronization core: on-wire encoding of
//! the LSA-phase packet types, receive-side validation and dispatch into
//! an LSDB, and the retransmission discipline that drives LSA flooding to
//! convergence.
//!
//! Hello/DBD negotiation, LSDB storage/aging/SPF, route installation and
//! the administrative configuration plane are owned by collaborators
//! outside this crate; see [`lsdb::LsdbClient`], [`flood::Flooder`] and
//! [`output::FramePort`] for the seams.

pub mod ack_processor;
pub mod collections;
pub mod config;
pub mod debug;
pub mod error;
pub mod flood;
pub mod instance;
pub mod lsdb;
pub mod neighbor;
pub mod output;
pub mod packet;
pub mod request_driver;
pub mod retx_timer;
pub mod tasks;
pub mod update_receiver;
