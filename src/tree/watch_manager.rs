use parking_lot::Mutex;
use slog::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::types::{KeeperState, WatchedEvent, WatchedEventType, Watcher};

/// A watcher handle keyed by pointer identity, so the same `Arc` registered twice on one path
/// counts once.
#[derive(Clone)]
pub(crate) struct WatcherRef(pub(crate) Arc<dyn Watcher>);

impl WatcherRef {
    fn key(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for WatcherRef {
    fn eq(&self, other: &WatcherRef) -> bool {
        self.key() == other.key()
    }
}

impl Eq for WatcherRef {}

impl Hash for WatcherRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for WatcherRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WatcherRef").field("id", &self.0.id()).finish()
    }
}

/// Watch registrations grouped by watcher id.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WatchesReport {
    id2paths: HashMap<i64, HashSet<String>>,
}

impl WatchesReport {
    /// The paths watched by `id`, if it has any watches.
    pub fn paths(&self, id: i64) -> Option<&HashSet<String>> {
        self.id2paths.get(&id)
    }

    /// Iterate over `(watcher id, watched paths)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&i64, &HashSet<String>)> {
        self.id2paths.iter()
    }
}

/// Watch registrations grouped by path.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WatchesPathReport {
    path2ids: HashMap<String, HashSet<i64>>,
}

impl WatchesPathReport {
    /// The ids watching `path`, if any.
    pub fn watcher_ids(&self, path: &str) -> Option<&HashSet<i64>> {
        self.path2ids.get(path)
    }

    /// Iterate over `(path, watcher ids)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &HashSet<i64>)> {
        self.path2ids.iter()
    }
}

/// Totals across one watch table.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WatchesSummary {
    /// Distinct watchers with at least one registration.
    pub num_connections: usize,
    /// Distinct paths with at least one watcher.
    pub num_paths: usize,
    /// Total `(path, watcher)` registrations.
    pub num_total_watches: usize,
}

#[derive(Debug, Default)]
struct Tables {
    watch_table: HashMap<String, HashSet<WatcherRef>>,
    watch2paths: HashMap<WatcherRef, HashSet<String>>,
}

/// Maps paths to sets of one-shot watch handles.
///
/// Triggering an event atomically removes every watcher registered on the path and invokes each
/// exactly once; watchers that fail are logged and skipped. The tree keeps two instances, one for
/// data watches and one for child watches.
#[derive(Debug)]
pub(crate) struct WatchManager {
    tables: Mutex<Tables>,
    log: slog::Logger,
}

impl WatchManager {
    pub(crate) fn new(log: slog::Logger) -> WatchManager {
        WatchManager {
            tables: Mutex::new(Tables::default()),
            log,
        }
    }

    /// Register `watcher` on `path`. Idempotent per `(path, watcher)`.
    pub(crate) fn add_watch(&self, path: &str, watcher: Arc<dyn Watcher>) {
        let watcher = WatcherRef(watcher);
        let mut tables = self.tables.lock();
        tables
            .watch_table
            .entry(path.to_string())
            .or_default()
            .insert(watcher.clone());
        tables
            .watch2paths
            .entry(watcher)
            .or_default()
            .insert(path.to_string());
    }

    /// Fire and clear every watch on `path`, returning the cleared set.
    pub(crate) fn trigger_watch(
        &self,
        path: &str,
        event_type: WatchedEventType,
    ) -> HashSet<WatcherRef> {
        self.trigger(path, event_type, None)
    }

    /// Like [`WatchManager::trigger_watch`], but watchers in `suppress` are cleared without being
    /// invoked. Used so the data-watch set and child-watch set on one path do not double-fire on
    /// delete.
    pub(crate) fn trigger_watch_suppress(
        &self,
        path: &str,
        event_type: WatchedEventType,
        suppress: &HashSet<WatcherRef>,
    ) -> HashSet<WatcherRef> {
        self.trigger(path, event_type, Some(suppress))
    }

    fn trigger(
        &self,
        path: &str,
        event_type: WatchedEventType,
        suppress: Option<&HashSet<WatcherRef>>,
    ) -> HashSet<WatcherRef> {
        let event = WatchedEvent {
            event_type,
            keeper_state: KeeperState::SyncConnected,
            path: path.to_string(),
        };
        let watchers = {
            let mut tables = self.tables.lock();
            let watchers = match tables.watch_table.remove(path) {
                Some(watchers) => watchers,
                None => {
                    debug!(self.log, "no watchers to fire"; "path" => path, "type" => ?event_type);
                    return HashSet::new();
                }
            };
            for watcher in &watchers {
                if let Some(paths) = tables.watch2paths.get_mut(watcher) {
                    paths.remove(path);
                    if paths.is_empty() {
                        tables.watch2paths.remove(watcher);
                    }
                }
            }
            watchers
        };
        for watcher in &watchers {
            if suppress.map_or(false, |s| s.contains(watcher)) {
                continue;
            }
            if let Err(e) = watcher.0.process(event.clone()) {
                warn!(self.log, "watcher failed to process event";
                      "path" => path, "id" => watcher.0.id(), "error" => %e);
            }
        }
        watchers
    }

    /// True when `(path, watcher)` is registered.
    pub(crate) fn contains_watcher(&self, path: &str, watcher: &Arc<dyn Watcher>) -> bool {
        let watcher = WatcherRef(Arc::clone(watcher));
        self.tables
            .lock()
            .watch2paths
            .get(&watcher)
            .map_or(false, |paths| paths.contains(path))
    }

    /// Remove every registration held by `watcher`.
    pub(crate) fn remove_watcher(&self, watcher: &Arc<dyn Watcher>) {
        let watcher = WatcherRef(Arc::clone(watcher));
        let mut tables = self.tables.lock();
        let paths = match tables.watch2paths.remove(&watcher) {
            Some(paths) => paths,
            None => return,
        };
        for path in paths {
            if let Some(watchers) = tables.watch_table.get_mut(&path) {
                watchers.remove(&watcher);
                if watchers.is_empty() {
                    tables.watch_table.remove(&path);
                }
            }
        }
    }

    /// Remove the single `(path, watcher)` registration; true when something was removed.
    pub(crate) fn remove_watcher_at(&self, path: &str, watcher: &Arc<dyn Watcher>) -> bool {
        let watcher = WatcherRef(Arc::clone(watcher));
        let mut tables = self.tables.lock();
        let removed = match tables.watch2paths.get_mut(&watcher) {
            Some(paths) => paths.remove(path),
            None => false,
        };
        if !removed {
            return false;
        }
        if tables.watch2paths[&watcher].is_empty() {
            tables.watch2paths.remove(&watcher);
        }
        if let Some(watchers) = tables.watch_table.get_mut(path) {
            watchers.remove(&watcher);
            if watchers.is_empty() {
                tables.watch_table.remove(path);
            }
        }
        true
    }

    /// Total `(path, watcher)` registrations.
    pub(crate) fn size(&self) -> usize {
        self.tables
            .lock()
            .watch_table
            .values()
            .map(HashSet::len)
            .sum()
    }

    pub(crate) fn watches(&self) -> WatchesReport {
        let tables = self.tables.lock();
        let mut id2paths: HashMap<i64, HashSet<String>> = HashMap::new();
        for (watcher, paths) in &tables.watch2paths {
            id2paths
                .entry(watcher.0.id())
                .or_default()
                .extend(paths.iter().cloned());
        }
        WatchesReport { id2paths }
    }

    pub(crate) fn watches_by_path(&self) -> WatchesPathReport {
        let tables = self.tables.lock();
        let mut path2ids: HashMap<String, HashSet<i64>> = HashMap::new();
        for (path, watchers) in &tables.watch_table {
            path2ids
                .entry(path.clone())
                .or_default()
                .extend(watchers.iter().map(|w| w.0.id()));
        }
        WatchesPathReport { path2ids }
    }

    pub(crate) fn summary(&self) -> WatchesSummary {
        let tables = self.tables.lock();
        WatchesSummary {
            num_connections: tables.watch2paths.len(),
            num_paths: tables.watch_table.len(),
            num_total_watches: tables.watch2paths.values().map(HashSet::len).sum(),
        }
    }

    /// Text dump of the table, grouped by path or by watcher id.
    pub(crate) fn dump(&self, f: &mut dyn fmt::Write, by_path: bool) -> fmt::Result {
        let tables = self.tables.lock();
        if by_path {
            for (path, watchers) in &tables.watch_table {
                writeln!(f, "{}", path)?;
                for watcher in watchers {
                    writeln!(f, "\t0x{:x}", watcher.0.id())?;
                }
            }
        } else {
            for (watcher, paths) in &tables.watch2paths {
                writeln!(f, "0x{:x}", watcher.0.id())?;
                for path in paths {
                    writeln!(f, "\t{}", path)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for WatchManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let summary = self.summary();
        writeln!(
            f,
            "{} connections watching {} paths",
            summary.num_connections, summary.num_paths
        )?;
        write!(f, "Total watches:{}", summary.num_total_watches)
    }
}
