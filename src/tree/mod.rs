mod acl_cache;
mod node;
mod path_trie;
mod watch_manager;

pub use self::watch_manager::{WatchesPathReport, WatchesReport, WatchesSummary};

pub(crate) use self::acl_cache::OPEN_UNSAFE_ACL_ID;
use self::acl_cache::AclCache;
pub(crate) use self::node::DataNode;
use self::path_trie::PathTrie;
use self::watch_manager::WatchManager;

use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock};
use slog::{debug, error, o, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::error;
use crate::quota::{self, StatsTrack};
use crate::types::{
    Acl, EphemeralType, KeeperState, Stat, StatPersisted, WatchedEvent, WatchedEventType, Watcher,
    WatcherType,
};

/// Split an absolute path into its parent path and final name segment.
pub(crate) fn split_path(path: &str) -> (&str, &str) {
    let last_slash = path.rfind('/').unwrap_or(0);
    (&path[..last_slash], &path[last_slash + 1..])
}

/// The in-memory tree of znodes.
///
/// The tree maintains two parallel structures: a hash index from full paths to nodes, and the
/// parent/child links stored in the nodes themselves. All path lookups go through the index; the
/// links are walked only when serializing a snapshot. On top of the tree sit the indexes needed by
/// the surrounding server: ephemeral paths per session, the container and TTL path sets, and a
/// prefix trie locating the quota rule that governs a path.
///
/// Mutations arrive in zxid order from a single replay thread (the transaction processor); reads
/// may run concurrently with mutations and with each other. Lookups in the index are lock-free,
/// and each node guards its own fields with its own lock, so a reader sees either the complete
/// pre-state or the complete post-state of a mutation, never a torn mix.
///
/// The tree has no networking or connection handling in it, so it can be driven and tested
/// stand-alone.
#[derive(Debug)]
pub struct DataTree {
    /// Fast path-to-node lookup. The parent/child links inside the nodes are the authority on
    /// tree shape; this index must agree with them at all times.
    nodes: DashMap<String, Arc<Mutex<DataNode>>>,

    data_watches: WatchManager,
    child_watches: WatchManager,

    /// Tracks the paths that carry quotas.
    ptrie: RwLock<PathTrie>,

    /// The paths of each session's ephemeral nodes.
    ephemerals: DashMap<i64, Mutex<HashSet<String>>>,

    /// The paths of all container nodes.
    containers: DashSet<String>,

    /// The paths of all TTL nodes.
    ttls: DashSet<String>,

    pub(crate) acl_cache: AclCache,

    /// Published only after the corresponding mutation is visible in the tree.
    pub(crate) last_processed_zxid: AtomicI64,

    pub(crate) log: slog::Logger,
}

impl Default for DataTree {
    fn default() -> DataTree {
        DataTree::new()
    }
}

impl DataTree {
    /// An empty tree seeded with the reserved znodes, with logging disabled.
    pub fn new() -> DataTree {
        DataTree::with_logger(slog::Logger::root(slog::Discard, o!()))
    }

    /// An empty tree seeded with `/`, `/zookeeper`, `/zookeeper/quota`, and `/zookeeper/config`
    /// (the latter with a read-only ACL).
    pub fn with_logger(log: slog::Logger) -> DataTree {
        let tree = DataTree {
            nodes: DashMap::new(),
            data_watches: WatchManager::new(log.new(o!("watches" => "data"))),
            child_watches: WatchManager::new(log.new(o!("watches" => "child"))),
            ptrie: RwLock::new(PathTrie::new()),
            ephemerals: DashMap::new(),
            containers: DashSet::new(),
            ttls: DashSet::new(),
            acl_cache: AclCache::new(),
            last_processed_zxid: AtomicI64::new(0),
            log,
        };

        // Rather than fight it, let root have an alias.
        let root = blank_node();
        root.lock().add_child(&quota::PROC_ZOOKEEPER[1..]);
        tree.nodes.insert(String::new(), Arc::clone(&root));
        tree.nodes.insert("/".to_string(), root);

        let proc_node = blank_node();
        proc_node
            .lock()
            .add_child(&quota::QUOTA_ZOOKEEPER[quota::PROC_ZOOKEEPER.len() + 1..]);
        proc_node
            .lock()
            .add_child(&quota::CONFIG_ZOOKEEPER[quota::PROC_ZOOKEEPER.len() + 1..]);
        tree.nodes
            .insert(quota::PROC_ZOOKEEPER.to_string(), proc_node);
        tree.nodes
            .insert(quota::QUOTA_ZOOKEEPER.to_string(), blank_node());
        tree.nodes
            .insert(quota::CONFIG_ZOOKEEPER.to_string(), blank_node());
        if tree
            .set_acl(quota::CONFIG_ZOOKEEPER, Acl::read_unsafe(), -1)
            .is_err()
        {
            unreachable!("the config node was just seeded");
        }

        tree
    }

    pub(crate) fn node(&self, path: &str) -> Option<Arc<Mutex<DataNode>>> {
        self.nodes.get(path).map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn insert_node(&self, path: String, node: Arc<Mutex<DataNode>>) {
        self.nodes.insert(path, node);
    }

    pub(crate) fn clear_nodes(&self) {
        self.nodes.clear();
        self.ptrie.write().clear();
    }

    pub(crate) fn index_by_owner(&self, path: &str, ephemeral_owner: i64) {
        match EphemeralType::get(ephemeral_owner) {
            EphemeralType::Container => {
                self.containers.insert(path.to_string());
            }
            EphemeralType::Ttl => {
                self.ttls.insert(path.to_string());
            }
            _ if ephemeral_owner != 0 => {
                self.ephemerals
                    .entry(ephemeral_owner)
                    .or_insert_with(|| Mutex::new(HashSet::new()))
                    .lock()
                    .insert(path.to_string());
            }
            _ => {}
        }
    }

    /// Is the path one of the reserved znodes owned by the server itself?
    pub fn is_special_path(&self, path: &str) -> bool {
        path == "/"
            || path == quota::PROC_ZOOKEEPER
            || path == quota::QUOTA_ZOOKEEPER
            || path == quota::CONFIG_ZOOKEEPER
    }

    /// The zxid of the last transaction whose effects are fully visible in the tree.
    ///
    /// A reader that observes a value `>= z` here is guaranteed to observe every tree effect of
    /// every transaction with zxid `<= z`.
    pub fn last_processed_zxid(&self) -> i64 {
        self.last_processed_zxid.load(Ordering::Acquire)
    }

    // -------------------------------------------------------------------------------------------
    // Mutation primitives, invoked by the transaction processor in zxid order.
    // -------------------------------------------------------------------------------------------

    /// Add a new znode to the tree.
    ///
    /// `ephemeral_owner` carries the lifecycle class (see
    /// [`EphemeralType`]); `parent_cversion` is the authoritative child version assigned by the
    /// leader, or `-1` to take the parent's current cversion plus one. Updates the parent's
    /// metadata and the lifecycle indexes, accounts the node against any governing quota, and
    /// fires `NodeCreated` on the path and `NodeChildrenChanged` on the parent.
    pub fn create_node(
        &self,
        path: &str,
        data: Vec<u8>,
        acl: &[Acl],
        ephemeral_owner: i64,
        parent_cversion: i32,
        zxid: i64,
        time: i64,
    ) -> Result<Stat, error::Create> {
        let (parent_name, child_name) = split_path(path);
        let data_len = data.len();
        let stat = StatPersisted {
            ctime: time,
            mtime: time,
            czxid: zxid,
            mzxid: zxid,
            pzxid: zxid,
            version: 0,
            cversion: 0,
            aversion: 0,
            ephemeral_owner,
        };

        let parent = self.node(parent_name).ok_or(error::Create::NoNode)?;
        let created_stat;
        {
            let mut parent = parent.lock();
            if parent.has_child(child_name) {
                return Err(error::Create::NodeExists);
            }

            let parent_cversion = if parent_cversion == -1 {
                parent.stat.cversion + 1
            } else {
                parent_cversion
            };
            parent.stat.cversion = parent_cversion;
            parent.stat.pzxid = zxid;

            let handle = self.acl_cache.convert_acls(acl);
            let child = DataNode::new(data, handle, stat);
            created_stat = child.to_stat();
            parent.add_child(child_name);
            self.nodes
                .insert(path.to_string(), Arc::new(Mutex::new(child)));
            self.index_by_owner(path, ephemeral_owner);
        }

        // The quota mirror under /zookeeper/quota doubles as control surface: creating a limit
        // node turns its parent path into a quota subject.
        if parent_name.starts_with(quota::QUOTA_ZOOKEEPER) {
            let subject = &parent_name[quota::QUOTA_ZOOKEEPER.len()..];
            if child_name == quota::LIMIT_NODE {
                self.ptrie.write().add_path(subject);
            }
            if child_name == quota::STAT_NODE {
                self.update_quota_for_path(subject);
            }
        }
        if let Some(last_prefix) = self.max_prefix_with_quota(path) {
            self.update_count(&last_prefix, 1);
            self.update_bytes(&last_prefix, data_len as i64);
        }

        self.data_watches
            .trigger_watch(path, WatchedEventType::NodeCreated);
        self.child_watches.trigger_watch(
            if parent_name.is_empty() { "/" } else { parent_name },
            WatchedEventType::NodeChildrenChanged,
        );
        Ok(created_stat)
    }

    /// Remove the znode at `path`.
    ///
    /// The parent's `pzxid` moves to `zxid`; its `cversion` deliberately does not change. Fires
    /// `NodeDeleted` on the path from both watch tables (each watcher at most once) and
    /// `NodeChildrenChanged` on the parent.
    pub fn delete_node(&self, path: &str, zxid: i64) -> Result<(), error::Delete> {
        let (parent_name, child_name) = split_path(path);
        let node = self
            .nodes
            .remove(path)
            .map(|(_, node)| node)
            .ok_or(error::Delete::NoNode)?;
        {
            let node = node.lock();
            self.acl_cache.remove_usage(node.acl);
        }

        let parent = self.node(parent_name).ok_or(error::Delete::NoNode)?;
        {
            let mut parent = parent.lock();
            parent.remove_child(child_name);
            parent.stat.pzxid = zxid;
            let ephemeral_owner = node.lock().stat.ephemeral_owner;
            match EphemeralType::get(ephemeral_owner) {
                EphemeralType::Container => {
                    self.containers.remove(path);
                }
                EphemeralType::Ttl => {
                    self.ttls.remove(path);
                }
                _ if ephemeral_owner != 0 => {
                    if let Some(paths) = self.ephemerals.get(&ephemeral_owner) {
                        paths.lock().remove(path);
                    }
                }
                _ => {}
            }
        }

        if parent_name.starts_with(quota::QUOTA_ZOOKEEPER) && child_name == quota::LIMIT_NODE {
            self.ptrie
                .write()
                .delete_path(&parent_name[quota::QUOTA_ZOOKEEPER.len()..]);
        }
        if let Some(last_prefix) = self.max_prefix_with_quota(path) {
            self.update_count(&last_prefix, -1);
            let bytes = -(node.lock().data.len() as i64);
            self.update_bytes(&last_prefix, bytes);
        }

        let processed = self
            .data_watches
            .trigger_watch(path, WatchedEventType::NodeDeleted);
        self.child_watches
            .trigger_watch_suppress(path, WatchedEventType::NodeDeleted, &processed);
        self.child_watches.trigger_watch(
            if parent_name.is_empty() { "/" } else { parent_name },
            WatchedEventType::NodeChildrenChanged,
        );
        Ok(())
    }

    /// Replace the data of the znode at `path`.
    ///
    /// `version` is the authoritative new data version from the leader; it was validated against
    /// the expected version before the transaction was logged. Fires `NodeDataChanged` on the
    /// path; child watches are untouched.
    pub fn set_data(
        &self,
        path: &str,
        data: Vec<u8>,
        version: i32,
        zxid: i64,
        time: i64,
    ) -> Result<Stat, error::SetData> {
        let data_len = data.len();
        let node = self.node(path).ok_or(error::SetData::NoNode)?;
        let (stat, last_len) = {
            let mut node = node.lock();
            let last_len = node.data.len();
            node.data = data;
            node.stat.mtime = time;
            node.stat.mzxid = zxid;
            node.stat.version = version;
            (node.to_stat(), last_len)
        };

        if let Some(last_prefix) = self.max_prefix_with_quota(path) {
            self.update_bytes(&last_prefix, data_len as i64 - last_len as i64);
        }
        self.data_watches
            .trigger_watch(path, WatchedEventType::NodeDataChanged);
        Ok(stat)
    }

    /// Replace the ACL of the znode at `path`, setting `aversion` to `version`.
    ///
    /// Deliberately fires no watch.
    pub fn set_acl(&self, path: &str, acl: &[Acl], version: i32) -> Result<Stat, error::SetAcl> {
        let node = self.node(path).ok_or(error::SetAcl::NoNode)?;
        let mut node = node.lock();
        self.acl_cache.remove_usage(node.acl);
        node.stat.aversion = version;
        node.acl = self.acl_cache.convert_acls(acl);
        Ok(node.to_stat())
    }

    /// Delete every ephemeral znode owned by `session`.
    ///
    /// The deletes run the full [`DataTree::delete_node`] path, watch firing included, in
    /// unspecified order. A node already gone is logged and skipped.
    pub fn kill_session(&self, session: i64, zxid: i64) {
        // The set is detached from the index before the sweep; create and delete run on the same
        // replay thread, so nothing re-populates it mid-loop.
        let paths = match self.ephemerals.remove(&session) {
            Some((_, paths)) => paths.into_inner(),
            None => return,
        };
        for path in paths {
            match self.delete_node(&path, zxid) {
                Ok(()) => {
                    debug!(self.log, "deleted ephemeral node of closed session";
                           "path" => %path, "session" => session)
                }
                Err(error::Delete::NoNode) => {
                    warn!(self.log, "ignoring missing ephemeral node of closed session";
                          "path" => %path, "session" => session)
                }
            }
        }
    }

    /// Set the `cversion` and `pzxid` of the znode at `path`, used to repair a parent whose
    /// children replayed on top of a snapshot that had already captured them.
    ///
    /// The values move only if `new_cversion` is greater than the node's current `cversion`; a
    /// `new_cversion` of `-1` means the current `cversion` plus one. A trailing `/` on `path` is
    /// ignored.
    pub fn set_cversion_pzxid(
        &self,
        path: &str,
        new_cversion: i32,
        zxid: i64,
    ) -> Result<(), error::SetData> {
        let path = path.strip_suffix('/').unwrap_or(path);
        let node = self.node(path).ok_or(error::SetData::NoNode)?;
        let mut node = node.lock();
        let new_cversion = if new_cversion == -1 {
            node.stat.cversion + 1
        } else {
            new_cversion
        };
        if new_cversion > node.stat.cversion {
            node.stat.cversion = new_cversion;
            node.stat.pzxid = zxid;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------------------------
    // Quota accounting.
    // -------------------------------------------------------------------------------------------

    /// The quota subject governing `path`, if any. The root is never a quota subject.
    fn max_prefix_with_quota(&self, path: &str) -> Option<String> {
        let last_prefix = self.ptrie.read().find_max_prefix(path);
        if last_prefix.is_empty() || last_prefix == "/" {
            None
        } else {
            Some(last_prefix)
        }
    }

    fn read_track(&self, path: &str, what: &str) -> Option<(Arc<Mutex<DataNode>>, StatsTrack)> {
        let node = match self.node(path) {
            Some(node) => node,
            None => {
                error!(self.log, "missing quota node"; "path" => path, "updating" => what);
                return None;
            }
        };
        let parsed = String::from_utf8_lossy(&node.lock().data).parse::<StatsTrack>();
        match parsed {
            Ok(track) => Some((node, track)),
            Err(e) => {
                error!(self.log, "unparsable quota node"; "path" => path, "error" => %e);
                None
            }
        }
    }

    /// Add `diff` to the znode count tracked for the quota subject `last_prefix`, warning when
    /// the configured limit is exceeded. The transaction is never rejected for a quota breach.
    fn update_count(&self, last_prefix: &str, diff: i64) {
        let stat_path = quota::stat_path(last_prefix);
        let updated = match self.read_track(&stat_path, "count") {
            Some((node, mut track)) => {
                track.count += diff;
                node.lock().data = track.to_string().into_bytes();
                track
            }
            None => return,
        };
        let quota_path = quota::quota_path(last_prefix);
        let limit = match self.read_track(&quota_path, "count") {
            Some((_, track)) => track,
            None => return,
        };
        if limit.count > -1 && limit.count < updated.count {
            warn!(self.log, "quota exceeded";
                  "path" => last_prefix, "count" => updated.count, "limit" => limit.count);
        }
    }

    /// Add `diff` to the data bytes tracked for the quota subject `last_prefix`.
    fn update_bytes(&self, last_prefix: &str, diff: i64) {
        let stat_path = quota::stat_path(last_prefix);
        let updated = match self.read_track(&stat_path, "bytes") {
            Some((node, mut track)) => {
                track.bytes += diff;
                node.lock().data = track.to_string().into_bytes();
                track
            }
            None => return,
        };
        let quota_path = quota::quota_path(last_prefix);
        let limit = match self.read_track(&quota_path, "bytes") {
            Some((_, track)) => track,
            None => return,
        };
        if limit.bytes > -1 && limit.bytes < updated.bytes {
            warn!(self.log, "quota exceeded";
                  "path" => last_prefix, "bytes" => updated.bytes, "limit" => limit.bytes);
        }
    }

    /// Recompute the absolute counters for the quota subject `path` by walking its subtree, and
    /// store them in the subject's stats node. Used when a stats node is first created and on
    /// snapshot restore.
    fn update_quota_for_path(&self, path: &str) {
        let mut counts = Counts::default();
        self.get_counts(path, &mut counts);
        let track = StatsTrack::new(counts.count, counts.bytes);
        let stat_path = quota::stat_path(path);
        match self.node(&stat_path) {
            Some(node) => node.lock().data = track.to_string().into_bytes(),
            None => warn!(self.log, "missing quota stats node"; "path" => stat_path),
        }
    }

    fn get_counts(&self, path: &str, counts: &mut Counts) {
        let node = match self.node(path) {
            Some(node) => node,
            None => return,
        };
        let (children, data_len) = {
            let node = node.lock();
            let children: Vec<String> = node.children().iter().cloned().collect();
            (children, node.data.len() as i64)
        };
        counts.count += 1;
        counts.bytes += data_len;
        for child in children {
            self.get_counts(&format!("{}/{}", path, child), counts);
        }
    }

    /// Rebuild the quota trie and recompute every stats node from the tree itself, by traversing
    /// the `/zookeeper/quota` mirror. Called at the end of a snapshot restore.
    pub(crate) fn setup_quota(&self) {
        if self.node(quota::QUOTA_ZOOKEEPER).is_none() {
            return;
        }
        self.traverse_quota_node(quota::QUOTA_ZOOKEEPER);
    }

    fn traverse_quota_node(&self, path: &str) {
        let node = match self.node(path) {
            Some(node) => node,
            None => return,
        };
        let children: Vec<String> = node.lock().children().iter().cloned().collect();
        if children.is_empty() {
            let suffix = format!("/{}", quota::LIMIT_NODE);
            if path.ends_with(&suffix) {
                let subject = &path[quota::QUOTA_ZOOKEEPER.len()..path.len() - suffix.len()];
                self.update_quota_for_path(subject);
                self.ptrie.write().add_path(subject);
            }
            return;
        }
        for child in children {
            self.traverse_quota_node(&format!("{}/{}", path, child));
        }
    }

    // -------------------------------------------------------------------------------------------
    // Query primitives. Everything handed out is a defensive copy.
    // -------------------------------------------------------------------------------------------

    /// The data and stat of the znode at `path`, optionally leaving a data watch.
    pub fn get_data(
        &self,
        path: &str,
        watcher: Option<Arc<dyn Watcher>>,
    ) -> Result<(Vec<u8>, Stat), error::GetData> {
        let node = self.node(path).ok_or(error::GetData::NoNode)?;
        let node = node.lock();
        if let Some(watcher) = watcher {
            self.data_watches.add_watch(path, watcher);
        }
        Ok((node.data.clone(), node.to_stat()))
    }

    /// The stat of the znode at `path`.
    ///
    /// A watch, if given, is registered even when the node does not exist, so it fires on a
    /// future `NodeCreated`.
    pub fn stat_node(
        &self,
        path: &str,
        watcher: Option<Arc<dyn Watcher>>,
    ) -> Result<Stat, error::GetData> {
        if let Some(watcher) = watcher {
            self.data_watches.add_watch(path, watcher);
        }
        let node = self.node(path).ok_or(error::GetData::NoNode)?;
        let node = node.lock();
        Ok(node.to_stat())
    }

    /// The child names and stat of the znode at `path`, optionally leaving a child watch.
    ///
    /// The returned list is not sorted and no guarantee is provided as to its order.
    pub fn get_children(
        &self,
        path: &str,
        watcher: Option<Arc<dyn Watcher>>,
    ) -> Result<(Vec<String>, Stat), error::GetData> {
        let node = self.node(path).ok_or(error::GetData::NoNode)?;
        let node = node.lock();
        if let Some(watcher) = watcher {
            self.child_watches.add_watch(path, watcher);
        }
        Ok((
            node.children().iter().cloned().collect(),
            node.to_stat(),
        ))
    }

    /// The ACL and stat of the znode at `path`.
    pub fn get_acl(&self, path: &str) -> Result<(Vec<Acl>, Stat), error::GetAcl> {
        let node = self.node(path).ok_or(error::GetAcl::NoNode)?;
        let node = node.lock();
        Ok((self.acl_cache.convert_long(node.acl), node.to_stat()))
    }

    /// The interned ACL list behind `handle`, for serving a node whose handle is already known,
    /// such as one read back from a snapshot record.
    ///
    /// # Panics
    ///
    /// If `handle` was never produced by this tree's cache; handing the tree a foreign handle is
    /// a programming error.
    pub fn acl_for_handle(&self, handle: i64) -> Vec<Acl> {
        self.acl_cache.convert_long(handle)
    }

    /// The paths of the ephemeral znodes owned by `session_id`.
    pub fn get_ephemerals(&self, session_id: i64) -> HashSet<String> {
        self.ephemerals
            .get(&session_id)
            .map(|paths| paths.lock().clone())
            .unwrap_or_default()
    }

    /// Every session with ephemerals, mapped to the paths it owns.
    pub fn ephemerals(&self) -> HashMap<i64, HashSet<String>> {
        self.ephemerals
            .iter()
            .map(|entry| (*entry.key(), entry.value().lock().clone()))
            .collect()
    }

    /// The ids of the sessions that currently own ephemerals.
    pub fn sessions(&self) -> Vec<i64> {
        self.ephemerals.iter().map(|entry| *entry.key()).collect()
    }

    /// The paths of all container znodes.
    pub fn containers(&self) -> HashSet<String> {
        self.containers.iter().map(|path| path.key().clone()).collect()
    }

    /// The paths of all TTL znodes.
    pub fn ttls(&self) -> HashSet<String> {
        self.ttls.iter().map(|path| path.key().clone()).collect()
    }

    /// The number of entries in the path index (the root is aliased and counts twice).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total watches across the data and child tables.
    pub fn watch_count(&self) -> usize {
        self.data_watches.size() + self.child_watches.size()
    }

    /// Total ephemeral znodes across all sessions.
    pub fn ephemerals_count(&self) -> usize {
        self.ephemerals
            .iter()
            .map(|entry| entry.value().lock().len())
            .sum()
    }

    /// The rough size of the tree: path lengths plus data lengths.
    pub fn approximate_data_size(&self) -> u64 {
        self.nodes
            .iter()
            .map(|entry| entry.key().len() as u64 + entry.value().lock().approximate_data_size())
            .sum()
    }

    /// The number of distinct interned ACLs.
    pub fn acl_cache_size(&self) -> usize {
        self.acl_cache.size()
    }

    // -------------------------------------------------------------------------------------------
    // Watch administration.
    // -------------------------------------------------------------------------------------------

    /// Re-register a reconnecting session's watches, replaying any events it missed.
    ///
    /// `relative_zxid` is the last zxid the session observed; a watched node that changed past it
    /// (or disappeared, or appeared for an exists watch) gets the corresponding event delivered
    /// immediately instead of a registration.
    pub fn set_watches(
        &self,
        relative_zxid: i64,
        data_watches: &[String],
        exist_watches: &[String],
        child_watches: &[String],
        watcher: Arc<dyn Watcher>,
    ) {
        for path in data_watches {
            match self.node(path) {
                None => {
                    self.deliver(&watcher, WatchedEventType::NodeDeleted, path);
                }
                Some(node) if node.lock().stat.mzxid > relative_zxid => {
                    self.deliver(&watcher, WatchedEventType::NodeDataChanged, path);
                }
                Some(_) => self.data_watches.add_watch(path, Arc::clone(&watcher)),
            }
        }

        for path in exist_watches {
            match self.node(path) {
                Some(_) => self.deliver(&watcher, WatchedEventType::NodeCreated, path),
                None => self.data_watches.add_watch(path, Arc::clone(&watcher)),
            }
        }

        for path in child_watches {
            match self.node(path) {
                None => {
                    self.deliver(&watcher, WatchedEventType::NodeDeleted, path);
                }
                Some(node) if node.lock().stat.pzxid > relative_zxid => {
                    self.deliver(&watcher, WatchedEventType::NodeChildrenChanged, path);
                }
                Some(_) => self.child_watches.add_watch(path, Arc::clone(&watcher)),
            }
        }
    }

    fn deliver(&self, watcher: &Arc<dyn Watcher>, event_type: WatchedEventType, path: &str) {
        let event = WatchedEvent {
            event_type,
            keeper_state: KeeperState::SyncConnected,
            path: path.to_string(),
        };
        if let Err(e) = watcher.process(event) {
            warn!(self.log, "watcher failed to process replayed event";
                  "path" => path, "id" => watcher.id(), "error" => %e);
        }
    }

    /// True when `watcher` is registered on `path` in the selected table(s).
    pub fn contains_watcher(
        &self,
        path: &str,
        watcher_type: WatcherType,
        watcher: &Arc<dyn Watcher>,
    ) -> bool {
        match watcher_type {
            WatcherType::Children => self.child_watches.contains_watcher(path, watcher),
            WatcherType::Data => self.data_watches.contains_watcher(path, watcher),
            WatcherType::Any => {
                self.child_watches.contains_watcher(path, watcher)
                    || self.data_watches.contains_watcher(path, watcher)
            }
        }
    }

    /// Remove the `(path, watcher)` registration from the selected table(s); true when any
    /// registration was removed.
    pub fn remove_watch(
        &self,
        path: &str,
        watcher_type: WatcherType,
        watcher: &Arc<dyn Watcher>,
    ) -> bool {
        match watcher_type {
            WatcherType::Children => self.child_watches.remove_watcher_at(path, watcher),
            WatcherType::Data => self.data_watches.remove_watcher_at(path, watcher),
            WatcherType::Any => {
                let children = self.child_watches.remove_watcher_at(path, watcher);
                let data = self.data_watches.remove_watcher_at(path, watcher);
                children || data
            }
        }
    }

    /// Strip every watch held by a departed connection's watcher.
    pub fn remove_cnxn(&self, watcher: &Arc<dyn Watcher>) {
        self.data_watches.remove_watcher(watcher);
        self.child_watches.remove_watcher(watcher);
    }

    /// Data-watch registrations grouped by watcher id.
    pub fn watches(&self) -> WatchesReport {
        self.data_watches.watches()
    }

    /// Data-watch registrations grouped by path.
    pub fn watches_by_path(&self) -> WatchesPathReport {
        self.data_watches.watches_by_path()
    }

    /// Totals for the data-watch table.
    pub fn watches_summary(&self) -> WatchesSummary {
        self.data_watches.summary()
    }

    /// Write a one-line summary of the data watches.
    pub fn dump_watches_summary(&self, f: &mut dyn fmt::Write) -> fmt::Result {
        write!(f, "{}", self.data_watches)
    }

    /// Write a full dump of the data watches. Expensive; use sparingly.
    pub fn dump_watches(&self, f: &mut dyn fmt::Write, by_path: bool) -> fmt::Result {
        self.data_watches.dump(f, by_path)
    }

    /// Write a dump of all ephemerals, grouped by owning session.
    pub fn dump_ephemerals(&self, f: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(f, "Sessions with Ephemerals ({}):", self.ephemerals.len())?;
        for entry in self.ephemerals.iter() {
            writeln!(f, "0x{:x}:", entry.key())?;
            for path in entry.value().lock().iter() {
                writeln!(f, "\t{}", path)?;
            }
        }
        Ok(())
    }
}

fn blank_node() -> Arc<Mutex<DataNode>> {
    Arc::new(Mutex::new(DataNode::new(
        Vec::new(),
        OPEN_UNSAFE_ACL_ID,
        StatPersisted::default(),
    )))
}

#[derive(Debug, Default)]
struct Counts {
    count: i64,
    bytes: i64,
}
