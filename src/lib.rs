//! This crate provides the in-memory hierarchical data store that backs a replicated
//! coordination service in the style of [Apache ZooKeeper](https://zookeeper.apache.org/).
//!
//! # The data model
//!
//! The store keeps a tree of named nodes, called
//! "[Znodes](https://zookeeper.apache.org/doc/current/zookeeperProgrammers.html#sc_zkDataModel_znodes)".
//! Keys look like paths (e.g., `/key/subkey`), and every item along a path is itself a znode.
//! Each znode (including those with children) carries opaque data, an access-control list, and
//! metadata such as [modification
//! timestamps](https://zookeeper.apache.org/doc/current/zookeeperProgrammers.html#sc_timeInZk)
//! and version counters that let clients avoid stepping on each other's toes when accessing
//! values. Beyond plain persistent znodes there are [ephemeral
//! nodes](https://zookeeper.apache.org/doc/current/zookeeperProgrammers.html#Ephemeral+Nodes)
//! tied to the session that created them, container nodes that become collectable once emptied,
//! and TTL nodes that may expire after idling childless.
//!
//! # This implementation
//!
//! This library is the *server-side core* only: the tree, the transaction processor that applies
//! a replicated log to it, the snapshot codec, the quota bookkeeping kept under
//! `/zookeeper/quota`, and the one-shot
//! [watch](https://zookeeper.apache.org/doc/current/zookeeperProgrammers.html#ch_zkWatches)
//! machinery. There is no networking, quorum, session tracking, or request validation in here;
//! the surrounding server supplies transactions in zxid order and consumes the watch events. The
//! analogous component in the [official Java
//! implementation](https://zookeeper.apache.org/doc/current/api/org/apache/zookeeper/ZooKeeper.html)
//! is the `DataTree` and its satellites, and where behavior is subtle (who bumps `cversion`,
//! which watches fire on delete, how a multi reports a mid-stream failure) this implementation
//! follows it deliberately.
//!
//! The store is synchronous. Mutations must arrive from a single replay thread; reads may run
//! concurrently with them and with each other, and always return defensive copies. Watch
//! callbacks run on the thread applying the triggering mutation and must be brief.
//!
//! # A somewhat silly example
//!
//! ```
//! use zktree::*;
//!
//! let tree = DataTree::new();
//!
//! // a session leaves an exists watch on a path that is not there yet
//! let (watcher, mut events) = ChannelWatcher::new(0x1000);
//! assert!(tree.stat_node("/example", Some(watcher)).is_err());
//!
//! // the commit pipeline applies a create transaction
//! let rc = tree.process_txn(
//!     &TxnHeader {
//!         client_id: 0x1000,
//!         cxid: 1,
//!         zxid: 1,
//!         time: 1_687_000_000_000,
//!         op: OpCode::Create,
//!     },
//!     &Txn::Create(CreateTxn {
//!         path: "/example".to_string(),
//!         data: b"Hello world".to_vec(),
//!         acl: Acl::open_unsafe().to_vec(),
//!         ephemeral: false,
//!         parent_cversion: -1,
//!     }),
//! );
//! assert_eq!(rc.err, 0);
//! assert_eq!(tree.last_processed_zxid(), 1);
//!
//! // the watch fired exactly once
//! let event = events.try_next().unwrap().unwrap();
//! assert_eq!(event.event_type, WatchedEventType::NodeCreated);
//! assert_eq!(event.path, "/example");
//!
//! // and the data is there to read
//! let (data, stat) = tree.get_data("/example", None).unwrap();
//! assert_eq!(data, b"Hello world");
//! assert_eq!(stat.data_length as usize, b"Hello world".len());
//! ```

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![deny(missing_copy_implementations)]

/// Per-operation tree error types and the stable code taxonomy.
pub mod error;
/// Reserved management paths and quota blobs.
pub mod quota;
mod session;
mod snapshot;
mod tree;
mod txn;
mod types;

pub use crate::session::{
    check_upgrade_session, ClientRequest, UpgradeRequest, UpgradeableSessionTracker,
};
pub use crate::snapshot::{ReadFrom, WriteTo};
pub use crate::tree::{DataTree, WatchesPathReport, WatchesReport, WatchesSummary};
pub use crate::txn::{
    CheckVersionTxn, CreateContainerTxn, CreateTtlTxn, CreateTxn, DeleteTxn, ErrorTxn, OpCode,
    ProcessTxnResult, SetAclTxn, SetDataTxn, Txn, TxnHeader,
};
pub use crate::types::{
    Acl, ChannelWatcher, CreateMode, EphemeralType, KeeperState, Permission, Stat, StatPersisted,
    WatchedEvent, WatchedEventType, Watcher, WatcherType, CONTAINER_EPHEMERAL_OWNER, MAX_TTL,
};
pub use crate::error::ZkError;
