//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Per-neighbor state: the adjacency's LSA-phase bookkeeping lists and the
//! retransmission tasks that drive them.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

use crate::collections::{NeighborId, NeighborNetId};
use crate::debug::Debug;
use crate::packet::lsa::LsaHeader;
use crate::tasks::{IntervalTask, TimeoutTask};

/// Wakes the engine to run one `RxmtInterval` tick or delayed-ack flush
/// for a specific neighbor. Sent by that neighbor's own `IntervalTask`/
/// `TimeoutTask` callback, never by a mutation reaching across a task
/// boundary.
#[derive(Clone, Copy, Debug)]
pub enum TimerTick {
    Retransmit(NeighborId),
    DelayedAck(NeighborId),
}

/// Neighbor finite-state machine states. Only `Exchange`, `Loading` and
/// `Full` are meaningful to this core; earlier states belong to the Hello/
/// DBD negotiation owned elsewhere, and are carried here only so a
/// `Neighbor` can record where its adjacency currently stands.
pub mod nsm {
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
    #[derive(Deserialize, Serialize)]
    pub enum State {
        #[default]
        Down,
        Attempt,
        Init,
        TwoWay,
        ExStart,
        Exchange,
        Loading,
        Full,
    }

    impl State {
        /// Whether this state accepts LSR/LSU/LSAck packets per the
        /// adjacency state machine.
        pub fn accepts_lsa_phase_packets(&self) -> bool {
            *self >= State::Exchange
        }
    }

    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    pub enum Event {
        /// The request list has emptied: Loading -> Full.
        LoadingDone,
        /// The retransmission timer observed no activity past DeadInterval.
        Kill,
    }
}

/// A request-list entry. Tombstoned (`valid = false`) rather than removed
/// immediately so `buildAndSendRequest`'s cursor never has to shift
/// indices mid-scan; the list is compacted lazily.
#[derive(Clone, Debug)]
pub struct RequestEntry {
    pub hdr: LsaHeader,
    pub valid: bool,
}

/// A retransmission-list entry awaiting acknowledgment.
#[derive(Clone, Debug)]
pub struct RetxEntry {
    pub hdr: LsaHeader,
    pub first_sent_at: Instant,
    pub last_sent_at: Instant,
}

/// The per-neighbor LSA-phase bookkeeping described in the data model: an
/// ordered request list with an advancing cursor, a retransmission list,
/// and a pending (delayed) acknowledgment list.
#[derive(Debug, Default)]
pub struct NeighborLsaState {
    pub request_list: Vec<RequestEntry>,
    pub request_cursor: usize,
    pub retx_list: Vec<RetxEntry>,
    pub pending_ack_list: Vec<LsaHeader>,
}

impl NeighborLsaState {
    /// Number of still-valid (non-tombstoned) entries remaining at or
    /// after the cursor.
    ///
    /// The original implementation this core replaces computed this as
    /// `u8::from(len) - index`, which underflows when the cursor has
    /// advanced past a list shortened by compaction. Saturating
    /// subtraction on a wide integer makes that underflow structurally
    /// impossible instead of relying on callers never triggering it.
    pub fn remaining_requests(&self) -> usize {
        self.request_list
            .len()
            .saturating_sub(self.request_cursor)
    }

    /// Appends a newly learned LSA header to the request list. At
    /// `max_per_neighbor_lsas` the oldest entry (valid or already
    /// tombstoned) is dropped to make room, per the requestList overflow
    /// policy: oldest-drop, logged by the caller.
    pub fn enqueue_request(&mut self, hdr: LsaHeader, max_per_neighbor_lsas: usize) {
        if max_per_neighbor_lsas > 0 && self.request_list.len() >= max_per_neighbor_lsas {
            self.request_list.remove(0);
            self.request_cursor = self.request_cursor.saturating_sub(1);
        }
        self.request_list.push(RequestEntry { hdr, valid: true });
    }

    /// Drops tombstoned entries and resets the cursor to the first
    /// remaining valid entry. Keeps the list from growing unboundedly as
    /// requests are satisfied.
    pub fn compact_request_list(&mut self) {
        let live_from_cursor =
            self.request_list.split_off(self.request_cursor.min(self.request_list.len()));
        self.request_list = live_from_cursor
            .into_iter()
            .filter(|e| e.valid)
            .collect();
        self.request_cursor = 0;
    }

    /// Moves a request-list entry to the retransmission list: it has just
    /// been asked for, so we now expect to retransmit the ask until it is
    /// satisfied or the neighbor dies. Unlike `enqueue_request`, retxList
    /// is never drop-on-overflow: returns `false` at `max_per_neighbor_lsas`
    /// and leaves `hdr` out, so the caller can apply backpressure instead
    /// of silently losing a retransmission obligation.
    pub fn move_to_retx(
        &mut self,
        hdr: LsaHeader,
        now: Instant,
        max_per_neighbor_lsas: usize,
    ) -> bool {
        if self.retx_list.len() >= max_per_neighbor_lsas {
            return false;
        }
        self.retx_list.push(RetxEntry {
            hdr,
            first_sent_at: now,
            last_sent_at: now,
        });
        true
    }

    /// Removes a retransmission-list entry matching `key` with identical
    /// (seq_no, cksum), treating an age difference within MaxAgeDiff as a
    /// match too (RFC 2328's notion of "identical instance").
    pub fn remove_from_retx(&mut self, hdr: &LsaHeader) -> bool {
        let before = self.retx_list.len();
        self.retx_list.retain(|e| {
            !(e.hdr.key() == hdr.key()
                && e.hdr.seq_no == hdr.seq_no
                && e.hdr.cksum == hdr.cksum)
        });
        self.retx_list.len() != before
    }

    pub fn is_on_retx(&self, key: &crate::packet::lsa::LsaKey) -> bool {
        self.retx_list.iter().any(|e| &e.hdr.key() == key)
    }

    /// Appends to the pending (delayed) ack list, applying the same
    /// oldest-drop overflow policy as `enqueue_request`: a dropped ack is
    /// not a correctness problem, since the neighbor's own rxmt timer
    /// will eventually resend anything that truly went unacknowledged.
    pub fn push_pending_ack(&mut self, hdr: LsaHeader, max_per_neighbor_lsas: usize) {
        if max_per_neighbor_lsas > 0 && self.pending_ack_list.len() >= max_per_neighbor_lsas {
            self.pending_ack_list.remove(0);
        }
        self.pending_ack_list.push(hdr);
    }

    pub fn clear(&mut self) {
        self.request_list.clear();
        self.request_cursor = 0;
        self.retx_list.clear();
        self.pending_ack_list.clear();
    }
}

#[derive(Debug, Default)]
pub struct NeighborTasks {
    pub rxmt_lsreq: Option<IntervalTask>,
    pub rxmt_lsupd: Option<IntervalTask>,
    pub delayed_ack: Option<TimeoutTask>,
}

/// A single OSPFv2 neighbor, scoped to what the LSA-phase core needs: its
/// identity, adjacency state, and LSA bookkeeping. Hello/DBD fields
/// (priority, DR/BDR, DD sequence number) belong to the FSM owned
/// elsewhere and are not duplicated here.
#[derive(Debug)]
pub struct Neighbor {
    pub id: NeighborId,
    pub net_id: NeighborNetId,
    /// The OSPF area this neighbor's interface belongs to. Carried here
    /// rather than folded into `NeighborNetId`'s identity, since a
    /// neighbor is looked up by (interface, router ID) regardless of
    /// area, with area mismatches handled as a separate validation step.
    pub area_id: Ipv4Addr,
    pub state: nsm::State,
    pub lsa_state: NeighborLsaState,
    pub tasks: NeighborTasks,
}

impl Neighbor {
    pub(crate) fn new(id: NeighborId, net_id: NeighborNetId, area_id: Ipv4Addr) -> Neighbor {
        Neighbor {
            id,
            net_id,
            area_id,
            state: nsm::State::Down,
            lsa_state: Default::default(),
            tasks: Default::default(),
        }
    }

    /// Checks whether the request list has emptied out, transitioning
    /// Loading -> Full when it has.
    pub fn loading_done_check(&mut self) -> bool {
        if self.state == nsm::State::Loading
            && self.lsa_state.remaining_requests() == 0
        {
            self.state = nsm::State::Full;
            self.tasks.rxmt_lsreq = None;
            Debug::NeighborLoadingDone(self.net_id).log();
            true
        } else {
            false
        }
    }

    /// Clears all LSA-phase bookkeeping and stops its timers, used on
    /// adjacency reset (transition back to a pre-Exchange state).
    pub fn reset_adjacency(&mut self) {
        self.lsa_state.clear();
        self.tasks.rxmt_lsreq = None;
        self.tasks.rxmt_lsupd = None;
        self.tasks.delayed_ack = None;
    }

    /// Starts (or leaves running) the interval task that wakes the engine
    /// to keep driving `buildAndSendRequest` for this neighbor while
    /// requests remain outstanding. Mirrors the teacher's own
    /// `rxmt_lsreq_start`, called right after an LSR goes out.
    pub fn rxmt_lsreq_start(&mut self, rxmt_interval: Duration, timer_tx: Sender<TimerTick>) {
        if self.tasks.rxmt_lsreq.is_some() {
            return;
        }
        let id = self.id;
        self.tasks.rxmt_lsreq = Some(IntervalTask::new(rxmt_interval, false, move || {
            let timer_tx = timer_tx.clone();
            async move {
                let _ = timer_tx.send(TimerTick::Retransmit(id)).await;
            }
        }));
    }

    /// Starts the retransmission-list interval task if entries are
    /// outstanding and it isn't already running. Mirrors the teacher's
    /// own `rxmt_lsupd_start_check`, called right after an entry is added
    /// to the retransmission list.
    pub fn rxmt_lsupd_start_check(&mut self, rxmt_interval: Duration, timer_tx: Sender<TimerTick>) {
        if self.lsa_state.retx_list.is_empty() || self.tasks.rxmt_lsupd.is_some() {
            return;
        }
        let id = self.id;
        self.tasks.rxmt_lsupd = Some(IntervalTask::new(rxmt_interval, false, move || {
            let timer_tx = timer_tx.clone();
            async move {
                let _ = timer_tx.send(TimerTick::Retransmit(id)).await;
            }
        }));
    }

    pub fn rxmt_lsupd_stop_check(&mut self) {
        if self.lsa_state.retx_list.is_empty() {
            self.tasks.rxmt_lsupd = None;
        }
    }

    /// Starts the one-shot delayed-ack timer if one isn't already pending.
    /// Mirrors the teacher's own `enqueue_delayed_ack`, which starts its
    /// interface-scoped `ls_delayed_ack` timer the same way: idempotently,
    /// right after the first entry lands on the pending list.
    pub fn delayed_ack_start_check(
        &mut self,
        delayed_ack_interval: Duration,
        timer_tx: Sender<TimerTick>,
    ) {
        if self.tasks.delayed_ack.is_some() {
            return;
        }
        let id = self.id;
        self.tasks.delayed_ack = Some(TimeoutTask::new(delayed_ack_interval, move || async move {
            let _ = timer_tx.send(TimerTick::DelayedAck(id)).await;
        }));
    }

    /// Clears the delayed-ack timer once its pending list has been
    /// flushed, matching the teacher's own `process_delayed_ack_timeout`
    /// clearing `ls_delayed_ack` after the batched ack goes out.
    pub fn delayed_ack_stop(&mut self) {
        self.tasks.delayed_ack = None;
    }
}

impl Drop for Neighbor {
    fn drop(&mut self) {
        Debug::NeighborDelete(self.net_id).log();
    }
}
