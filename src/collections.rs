//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

//! Arena-backed storage for neighbors, keyed by typed indices rather than
//! cyclic back-references.

use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;

use generational_arena::Index;
use serde::{Deserialize, Serialize};

use crate::neighbor::Neighbor;

pub type ObjectId = u32;

/// A key that can either name an object by its stable numeric id (for
/// wire/IPC messages that must outlive a single process) or carry the
/// object's natural value directly (for lookups performed in the same
/// process where the arena is already in scope).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum ObjectKey<T> {
    Id(ObjectId),
    Value(T),
}

impl<T> From<ObjectId> for ObjectKey<T> {
    fn from(id: ObjectId) -> ObjectKey<T> {
        ObjectKey::Id(id)
    }
}

/// Opaque handle identifying an OSPF-enabled interface. The interface
/// lifecycle itself is owned outside this core; we only need a stable
/// token to scope neighbors and to address outbound frames.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct IntfKey(pub u32);

pub type NeighborId = ObjectId;
pub type NeighborIndex = Index;

/// The network-level identity of a neighbor: its router ID on the
/// interface it was learned on. Two neighbors with the same router ID on
/// different interfaces (e.g. parallel links) are distinct entries.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct NeighborNetId {
    pub iface_key: IntfKey,
    pub router_id: Ipv4Addr,
}

pub type NeighborKey = ObjectKey<NeighborNetId>;

/// Generational arena wrapper, mirroring the core library's convention of
/// never handing out raw indices without going through a typed newtype.
#[derive(Debug)]
pub struct Arena<T>(generational_arena::Arena<T>);

impl<T> Default for Arena<T> {
    fn default() -> Arena<T> {
        Arena(Default::default())
    }
}

impl<T> Arena<T> {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Index, &T)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Index, &mut T)> {
        self.0.iter_mut()
    }

    pub fn get(&self, index: Index) -> Option<&T> {
        self.0.get(index)
    }

    pub fn get_mut(&mut self, index: Index) -> Option<&mut T> {
        self.0.get_mut(index)
    }
}

impl<T> std::ops::Index<Index> for Arena<T> {
    type Output = T;

    fn index(&self, index: Index) -> &Self::Output {
        &self.0[index]
    }
}

impl<T> std::ops::IndexMut<Index> for Arena<T> {
    fn index_mut(&mut self, index: Index) -> &mut Self::Output {
        &mut self.0[index]
    }
}

/// Arena of live neighbors plus the secondary lookup trees used to resolve
/// a [`NeighborKey`] to its arena slot.
#[derive(Debug, Default)]
pub struct Neighbors {
    arena: Arena<Neighbor>,
    id_tree: HashMap<NeighborId, NeighborIndex>,
    net_id_tree: BTreeMap<NeighborNetId, NeighborIndex>,
    next_id: NeighborId,
}

impl Neighbors {
    pub fn insert(
        &mut self,
        iface_key: IntfKey,
        router_id: Ipv4Addr,
        area_id: Ipv4Addr,
    ) -> (NeighborIndex, &mut Neighbor) {
        self.next_id += 1;
        let net_id = NeighborNetId {
            iface_key,
            router_id,
        };
        let nbr = Neighbor::new(self.next_id, net_id, area_id);
        let nbr_idx = self.arena.0.insert(nbr);

        let nbr = &mut self.arena[nbr_idx];
        self.id_tree.insert(nbr.id, nbr_idx);
        self.net_id_tree.insert(net_id, nbr_idx);

        (nbr_idx, nbr)
    }

    pub fn delete(&mut self, nbr_idx: NeighborIndex) {
        let nbr = &self.arena[nbr_idx];
        self.id_tree.remove(&nbr.id);
        self.net_id_tree.remove(&nbr.net_id);
        self.arena.0.remove(nbr_idx);
    }

    pub fn get_by_id(&self, id: NeighborId) -> Option<(NeighborIndex, &Neighbor)> {
        self.id_tree
            .get(&id)
            .copied()
            .map(|idx| (idx, &self.arena[idx]))
    }

    pub fn get_by_net_id(
        &self,
        net_id: &NeighborNetId,
    ) -> Option<(NeighborIndex, &Neighbor)> {
        self.net_id_tree
            .get(net_id)
            .copied()
            .map(|idx| (idx, &self.arena[idx]))
    }

    pub fn get_mut_by_id(&mut self, id: NeighborId) -> Option<(NeighborIndex, &mut Neighbor)> {
        match self.id_tree.get(&id).copied() {
            Some(idx) => Some((idx, &mut self.arena[idx])),
            None => None,
        }
    }

    pub fn get_mut_by_net_id(
        &mut self,
        net_id: &NeighborNetId,
    ) -> Option<(NeighborIndex, &mut Neighbor)> {
        match self.net_id_tree.get(net_id).copied() {
            Some(idx) => Some((idx, &mut self.arena[idx])),
            None => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (NeighborIndex, &Neighbor)> {
        self.arena.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NeighborIndex, &mut Neighbor)> {
        self.arena.iter_mut()
    }
}

impl std::ops::Index<NeighborIndex> for Neighbors {
    type Output = Neighbor;

    fn index(&self, index: NeighborIndex) -> &Self::Output {
        &self.arena[index]
    }
}

impl std::ops::IndexMut<NeighborIndex> for Neighbors {
    fn index_mut(&mut self, index: NeighborIndex) -> &mut Self::Output {
        &mut self.arena[index]
    }
}
