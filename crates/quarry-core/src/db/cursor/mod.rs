//! Per-request resume state and its wire form.

mod signature;
mod token;
mod wire;

pub use signature::QuerySignature;
pub use token::{ContinuationToken, TokenState};
pub use wire::TokenWireError;

use derive_more::Deref;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

///
/// NodePath
///
/// Child indices from the root to one iterator node. `[]` is the root;
/// `[1, 0]` is the first child of the root's second child.
///

#[derive(
    Clone, Debug, Default, Deref, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);

        Self(path)
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(path: Vec<usize>) -> Self {
        Self(path)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }

        Ok(())
    }
}

///
/// CursorCache
///
/// Resume position per node path, filled during finalization of one
/// request and then serialized into the continuation token.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CursorCache {
    positions: BTreeMap<NodePath, Vec<u8>>,
}

impl CursorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the resume position of one node. A later write for the same
    /// path replaces the earlier one.
    pub fn insert(&mut self, path: NodePath, position: Vec<u8>) {
        self.positions.insert(path, position);
    }

    #[must_use]
    pub fn get(&self, path: &NodePath) -> Option<&[u8]> {
        self.positions.get(path).map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodePath, &[u8])> {
        self.positions
            .iter()
            .map(|(path, position)| (path, position.as_slice()))
    }
}

impl FromIterator<(NodePath, Vec<u8>)> for CursorCache {
    fn from_iter<I: IntoIterator<Item = (NodePath, Vec<u8>)>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_paths_extend_the_parent() {
        let path = NodePath::root().child(1).child(0);

        assert_eq!(path.as_slice(), &[1, 0]);
        assert_eq!(path.to_string(), "/1/0");
        assert_eq!(NodePath::root().to_string(), "/");
    }

    #[test]
    fn sibling_paths_never_collide() {
        let mut cache = CursorCache::new();
        cache.insert(NodePath::from(vec![1, 0]), vec![1]);
        cache.insert(NodePath::from(vec![10]), vec![2]);
        cache.insert(NodePath::from(vec![1, 0]), vec![3]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&NodePath::from(vec![1, 0])), Some(&[3u8][..]));
        assert_eq!(cache.get(&NodePath::from(vec![1])), None);
    }
}
