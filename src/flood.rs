//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Flooding is owned by an external collaborator: it alone knows the
//! full RFC 2328 §13.3 DR/BDR suppression rules across every neighbor on
//! an interface. This core only needs to hand off a newly installed LSA
//! plus the neighbor it arrived from.

use bytes::Bytes;

use crate::collections::NeighborKey;
use crate::packet::lsa::LsaKey;

/// Forwards an installed LSA to the flooder for re-distribution to other
/// neighbors/interfaces, per RFC 2328 §13.3.
pub trait Flooder: Send + Sync {
    fn flood(&self, ingress_nbr: NeighborKey, key: LsaKey, raw: Bytes);
}
