//! Card identity and arena indices
//!
//! Cards are identified by the external id of the record store (a Scryfall
//! UUID, or the lowercase name when a record carries none). Inside the synergy
//! graph cards are addressed by dense `NodeIndex` values instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable external identity of a card
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        CardId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CardId {
    fn from(s: &str) -> Self {
        CardId(s.to_string())
    }
}

impl From<String> for CardId {
    fn from(s: String) -> Self {
        CardId(s)
    }
}

/// Position of a card in the synergy graph's node arena
///
/// Keeps indices contiguous and small so adjacency lists stay dense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeIndex(u32);

impl NodeIndex {
    pub fn new(idx: usize) -> Self {
        NodeIndex(idx as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Position of an edge in the synergy graph's edge list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeIndex(u32);

impl EdgeIndex {
    pub fn new(idx: usize) -> Self {
        EdgeIndex(idx as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_id_ordering() {
        let a = CardId::new("a-123");
        let b = CardId::new("b-001");
        assert!(a < b);
        assert_eq!(a.to_string(), "a-123");
    }

    #[test]
    fn test_node_index_roundtrip() {
        let idx = NodeIndex::new(42);
        assert_eq!(idx.index(), 42);
        assert_eq!(idx.to_string(), "#42");
        assert_eq!(EdgeIndex::new(7).index(), 7);
    }
}
