//! Network-safe entity references.
//!
//! Entity ids are only meaningful inside the world that allocated them. At the
//! serialization boundary the server speaks in [`NetEntity`] handles, and each
//! client translates them into its own local ids through a [`NetEntityMap`].

use std::collections::BTreeMap;
use std::fmt;

use crate::state::{EntityId, WorldPosition};

/// Stable reference to a server-side entity, valid on every observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetEntity(pub u32);

impl NetEntity {
    /// Network handle of an authoritative entity.
    ///
    /// Returns `None` for client-local ids, which never cross the wire.
    pub fn from_server(entity: EntityId) -> Option<Self> {
        (!entity.is_client_local()).then_some(Self(entity.0))
    }
}

impl fmt::Display for NetEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net#{}", self.0)
    }
}

/// Client-side translation table between server handles and local ids.
///
/// Server entities are bound lazily: the first time a handle is seen it gets a
/// local id in the server range, so replicated ids never collide with ids the
/// client allocated for its own exclusive records.
#[derive(Clone, Debug, Default)]
pub struct NetEntityMap {
    to_local: BTreeMap<NetEntity, EntityId>,
    to_net: BTreeMap<EntityId, NetEntity>,
}

impl NetEntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a server handle to an explicit local id (e.g. the local player).
    pub fn bind(&mut self, net: NetEntity, local: EntityId) {
        if let Some(previous) = self.to_local.insert(net, local) {
            self.to_net.remove(&previous);
        }
        self.to_net.insert(local, net);
    }

    /// Resolves a server handle, binding it on first sight.
    pub fn resolve(&mut self, net: NetEntity) -> EntityId {
        if let Some(local) = self.to_local.get(&net) {
            return *local;
        }
        let local = EntityId(net.0);
        self.bind(net, local);
        local
    }

    pub fn local(&self, net: NetEntity) -> Option<EntityId> {
        self.to_local.get(&net).copied()
    }

    pub fn net(&self, local: EntityId) -> Option<NetEntity> {
        self.to_net.get(&local).copied()
    }

    pub fn forget(&mut self, net: NetEntity) -> Option<EntityId> {
        let local = self.to_local.remove(&net)?;
        self.to_net.remove(&local);
        Some(local)
    }

    pub fn len(&self) -> usize {
        self.to_local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_local.is_empty()
    }
}

/// Execution request as sent by a client. Carries no authority: the server
/// re-validates membership, gating and targeting before anything happens.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetExecutionRequest {
    pub action: NetEntity,
    pub entity_target: Option<NetEntity>,
    pub world_target: Option<WorldPosition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_local_ids_have_no_network_handle() {
        assert_eq!(NetEntity::from_server(EntityId(7)), Some(NetEntity(7)));
        assert_eq!(NetEntity::from_server(EntityId(EntityId::CLIENT_BASE + 3)), None);
    }

    #[test]
    fn rebinding_replaces_reverse_entry() {
        let mut map = NetEntityMap::new();
        assert_eq!(map.resolve(NetEntity(4)), EntityId(4));

        map.bind(NetEntity(4), EntityId(40));
        assert_eq!(map.local(NetEntity(4)), Some(EntityId(40)));
        assert_eq!(map.net(EntityId(4)), None);
        assert_eq!(map.net(EntityId(40)), Some(NetEntity(4)));
        assert_eq!(map.len(), 1);
    }
}
