//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Timing and resource-bound parameters for the neighbor link-state
//! synchronization core.
//!
//! This is deliberately a plain struct rather than a CRUD-capable
//! configuration plane: the administrative surface (interface/area/auth-key
//! management, northbound YANG) is out of scope here and owned elsewhere.

use std::time::Duration;

/// Parameters governing retransmission, acknowledgment batching and
/// resource bounds for a single OSPFv2 instance.
#[derive(Clone, Debug)]
pub struct Config {
    /// Interval between retransmissions of unacknowledged LSAs (RFC 2328
    /// `RxmtInterval`). Default 5 seconds.
    pub rxmt_interval: Duration,

    /// Maximum time an LSA may sit on the pending-ack list before a
    /// delayed acknowledgment is flushed. Default 1 second.
    pub delayed_ack_interval: Duration,

    /// Age difference, in seconds, below which two instances of the same
    /// LSA are considered equal rather than one being fresher (RFC 2328
    /// `MaxAgeDiff`). Fixed by the protocol at 900s but kept configurable
    /// for testing.
    pub max_age_diff: Duration,

    /// Interval after which a neighbor with no activity is declared dead.
    pub dead_interval: Duration,

    /// Upper bound on the number of entries carried in any one of a
    /// neighbor's request/retransmission/pending-ack lists. Exceeding it
    /// triggers the overflow handling described for each list.
    pub max_per_neighbor_lsas: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            rxmt_interval: Duration::from_secs(5),
            delayed_ack_interval: Duration::from_secs(1),
            max_age_diff: Duration::from_secs(900),
            dead_interval: Duration::from_secs(40),
            max_per_neighbor_lsas: 1024,
        }
    }
}
