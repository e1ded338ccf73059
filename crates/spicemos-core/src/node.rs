//! Node identifiers and the node registry.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Unique identifier for a node (or branch equation) in the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The ground node (node 0).
    pub const GROUND: NodeId = NodeId(0);

    /// Create a new NodeId from a raw value.
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Get the raw node ID value.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Row/column of this node in a vector that keeps ground at index 0.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Check if this is the ground node.
    pub fn is_ground(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ground() {
            write!(f, "GND")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Whether a node came from the netlist or was synthesized by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    External,
    Internal,
}

#[derive(Debug, Clone)]
struct NodeEntry {
    name: String,
    kind: NodeKind,
}

/// Registry of every node in the circuit.
///
/// Ground is always present as node 0. Devices may synthesize internal
/// nodes during setup and hand them back during unsetup; removing the most
/// recently created node releases its number so repeated setup/unsetup
/// cycles keep the system the same size.
#[derive(Debug, Clone)]
pub struct NodeTable {
    nodes: IndexMap<NodeId, NodeEntry>,
    next_id: u32,
}

impl Default for NodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTable {
    /// Create a table holding only the ground node.
    pub fn new() -> Self {
        let mut nodes = IndexMap::new();
        nodes.insert(
            NodeId::GROUND,
            NodeEntry {
                name: "0".to_string(),
                kind: NodeKind::External,
            },
        );
        Self { nodes, next_id: 1 }
    }

    /// Look up a node by name, creating it if it does not exist yet.
    ///
    /// The names "0" and "gnd" (any case) always resolve to ground.
    pub fn node(&mut self, name: &str) -> NodeId {
        if name == "0" || name.eq_ignore_ascii_case("gnd") {
            return NodeId::GROUND;
        }
        if let Some(id) = self.find(name) {
            return id;
        }
        self.insert(name.to_string(), NodeKind::External)
    }

    /// Find an existing node by name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, entry)| entry.name == name)
            .map(|(id, _)| *id)
    }

    /// Create an internal node owned by a device, named `owner#suffix`.
    pub fn create_internal(&mut self, owner: &str, suffix: &str) -> Result<NodeId> {
        let name = format!("{owner}#{suffix}");
        if self.find(&name).is_some() {
            return Err(Error::DuplicateNode(name));
        }
        let id = self.insert(name, NodeKind::Internal);
        log::debug!("created internal node {} ({})", id, owner);
        Ok(id)
    }

    /// Remove a node from the table.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if id.is_ground() || self.nodes.shift_remove(&id).is_none() {
            return Err(Error::UnknownNode(id));
        }
        if id.0 + 1 == self.next_id {
            self.next_id -= 1;
        }
        Ok(())
    }

    /// Name of a node, if it exists.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|entry| entry.name.as_str())
    }

    /// Kind of a node, if it exists.
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.get(&id).map(|entry| entry.kind)
    }

    /// Whether the node is registered.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes excluding ground.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    /// True when only ground is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of a vector indexed by [`NodeId::index`] that covers every node.
    pub fn vector_len(&self) -> usize {
        self.next_id as usize
    }

    /// Iterate over non-ground nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &str)> {
        self.nodes
            .iter()
            .filter(|(id, _)| !id.is_ground())
            .map(|(id, entry)| (*id, entry.name.as_str()))
    }

    fn insert(&mut self, name: String, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, NodeEntry { name, kind });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_aliases() {
        let mut table = NodeTable::new();
        assert_eq!(table.node("0"), NodeId::GROUND);
        assert_eq!(table.node("GND"), NodeId::GROUND);
        assert!(table.is_empty());
    }

    #[test]
    fn test_named_nodes_are_reused() {
        let mut table = NodeTable::new();
        let a = table.node("in");
        let b = table.node("out");
        assert_ne!(a, b);
        assert_eq!(table.node("in"), a);
        assert_eq!(table.len(), 2);
        assert_eq!(table.vector_len(), 3);
    }

    #[test]
    fn test_internal_node_cycle_keeps_size() {
        let mut table = NodeTable::new();
        table.node("d");
        let before = table.vector_len();
        for _ in 0..3 {
            let id = table.create_internal("m1", "drain").unwrap();
            assert_eq!(table.kind(id), Some(NodeKind::Internal));
            assert_eq!(table.name(id), Some("m1#drain"));
            table.remove(id).unwrap();
            assert_eq!(table.vector_len(), before);
        }
    }

    #[test]
    fn test_remove_unknown_node() {
        let mut table = NodeTable::new();
        assert!(matches!(
            table.remove(NodeId::new(7)),
            Err(Error::UnknownNode(_))
        ));
        assert!(table.remove(NodeId::GROUND).is_err());
    }

    #[test]
    fn test_duplicate_internal_node() {
        let mut table = NodeTable::new();
        table.create_internal("m1", "source").unwrap();
        assert!(matches!(
            table.create_internal("m1", "source"),
            Err(Error::DuplicateNode(_))
        ));
    }
}
