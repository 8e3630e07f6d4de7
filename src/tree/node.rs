use std::collections::HashSet;

use crate::types::{Stat, StatPersisted};

/// A single znode: its data, its interned ACL handle, its persisted metadata, and the names of its
/// children.
///
/// The tree owns every `DataNode` exclusively; external callers only ever see [`Stat`] projections
/// and copies of the data and child set. A node stores child *name segments*, not full paths; the
/// full child path is reconstructed by appending the segment to the node's own path.
#[derive(Clone, Debug)]
pub(crate) struct DataNode {
    pub(crate) data: Vec<u8>,
    pub(crate) acl: i64,
    pub(crate) stat: StatPersisted,
    children: HashSet<String>,
}

impl DataNode {
    pub(crate) fn new(data: Vec<u8>, acl: i64, stat: StatPersisted) -> DataNode {
        DataNode {
            data,
            acl,
            stat,
            children: HashSet::new(),
        }
    }

    pub(crate) fn add_child(&mut self, child: &str) -> bool {
        self.children.insert(child.to_string())
    }

    pub(crate) fn remove_child(&mut self, child: &str) -> bool {
        self.children.remove(child)
    }

    pub(crate) fn has_child(&self, child: &str) -> bool {
        self.children.contains(child)
    }

    pub(crate) fn children(&self) -> &HashSet<String> {
        &self.children
    }

    /// Project the node's metadata into a caller-facing [`Stat`].
    pub(crate) fn to_stat(&self) -> Stat {
        self.stat
            .to_stat(self.data.len() as i32, self.children.len() as i32)
    }

    /// Path length excluded; used by the tree's approximate-size accounting.
    pub(crate) fn approximate_data_size(&self) -> u64 {
        self.data.len() as u64
    }
}
