//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Processes inbound Link State Acknowledgments, removing matched entries
//! from a neighbor's retransmission list.

use crate::debug::Debug;
use crate::error::Error;
use crate::collections::NeighborKey;
use crate::neighbor::Neighbor;
use crate::packet::LsAck;

/// Contract: `processAck(nbrKey, headers[])`.
pub fn process_ack(nbr: &mut Neighbor, ack: LsAck) -> Result<(), Error> {
    if !nbr.state.accepts_lsa_phase_packets() {
        return Err(Error::WrongAdjacencyState(
            NeighborKey::Value(nbr.net_id),
            nbr.state,
        ));
    }

    for hdr in ack.lsa_hdrs {
        let key = hdr.key();
        if nbr.lsa_state.remove_from_retx(&hdr) {
            Debug::AckProcessed(&nbr.net_id, &key).log();
        } else {
            Debug::UnexpectedAck(&nbr.net_id, &key).log();
        }
    }

    nbr.rxmt_lsupd_stop_check();
    Ok(())
}
