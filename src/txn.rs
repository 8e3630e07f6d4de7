//! The replicated transaction stream and its application to the tree.
//!
//! The surrounding server feeds `(TxnHeader, Txn)` pairs, in zxid order and from a single replay
//! thread, into [`DataTree::process_txn`]. Bodies are a closed set of variants keyed by
//! [`OpCode`]; a `multi` body carries an ordered list of sub-transactions applied as one unit.

use slog::{debug, error};
use std::borrow::Cow;
use std::hash::{Hash, Hasher};
use std::sync::atomic::Ordering;

use crate::error::ZkError;
use crate::tree::{split_path, DataTree};
use crate::types::{Acl, EphemeralType, Stat, CONTAINER_EPHEMERAL_OWNER};

/// The operation kinds of the replication protocol.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[repr(i32)]
pub enum OpCode {
    /// A watch notification.
    Notification = 0,
    /// Create a znode.
    Create = 1,
    /// Delete a znode.
    Delete = 2,
    /// Check whether a znode exists.
    Exists = 3,
    /// Read a znode's data.
    GetData = 4,
    /// Replace a znode's data.
    SetData = 5,
    /// Read a znode's ACL.
    GetACL = 6,
    /// Replace a znode's ACL.
    SetACL = 7,
    /// List a znode's children.
    GetChildren = 8,
    /// Flush the leader/learner channel.
    Synchronize = 9,
    /// Keep-alive.
    Ping = 11,
    /// List a znode's children along with its stat.
    GetChildren2 = 12,
    /// Version check, only valid inside a multi.
    Check = 13,
    /// An atomic batch of operations.
    Multi = 14,
    /// Create a znode, returning its stat.
    Create2 = 15,
    /// Rewrite the dynamic configuration node.
    Reconfig = 16,
    /// Create a container znode.
    CreateContainer = 19,
    /// Delete a container znode.
    DeleteContainer = 20,
    /// Create a TTL znode.
    CreateTtl = 21,
    /// Add authentication info.
    Auth = 100,
    /// Re-register watches after a reconnect.
    SetWatches = 101,
    /// SASL handshake.
    Sasl = 102,
    /// Establish a session.
    CreateSession = -10,
    /// Tear down a session.
    CloseSession = -11,
    /// A failed operation.
    Error = -1,
}

/// A replicated transaction header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TxnHeader {
    /// The id of the session the transaction originated from.
    pub client_id: i64,
    /// The client-side sequence number of the originating request.
    pub cxid: i32,
    /// The transaction's position in the total order.
    pub zxid: i64,
    /// Leader wall-clock time, milliseconds since epoch.
    pub time: i64,
    /// The operation kind; create-family variants of the same body shape are distinguished here.
    pub op: OpCode,
}

/// The body of a create or create2 transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateTxn {
    /// Path of the znode to create.
    pub path: String,
    /// Initial data.
    pub data: Vec<u8>,
    /// Initial ACL.
    pub acl: Vec<Acl>,
    /// True when the znode is owned by the creating session.
    pub ephemeral: bool,
    /// Authoritative child version for the parent, assigned by the leader.
    pub parent_cversion: i32,
}

/// The body of a createTTL transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateTtlTxn {
    /// Path of the znode to create.
    pub path: String,
    /// Initial data.
    pub data: Vec<u8>,
    /// Initial ACL.
    pub acl: Vec<Acl>,
    /// Authoritative child version for the parent, assigned by the leader.
    pub parent_cversion: i32,
    /// Time to live, in milliseconds.
    pub ttl: i64,
}

/// The body of a createContainer transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateContainerTxn {
    /// Path of the znode to create.
    pub path: String,
    /// Initial data.
    pub data: Vec<u8>,
    /// Initial ACL.
    pub acl: Vec<Acl>,
    /// Authoritative child version for the parent, assigned by the leader.
    pub parent_cversion: i32,
}

/// The body of a delete or deleteContainer transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteTxn {
    /// Path of the znode to delete.
    pub path: String,
}

/// The body of a setData or reconfig transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct SetDataTxn {
    /// Path of the znode to update.
    pub path: String,
    /// Replacement data.
    pub data: Vec<u8>,
    /// Authoritative new data version, assigned by the leader.
    pub version: i32,
}

/// The body of a setACL transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct SetAclTxn {
    /// Path of the znode to update.
    pub path: String,
    /// Replacement ACL.
    pub acl: Vec<Acl>,
    /// Authoritative new ACL version, assigned by the leader.
    pub version: i32,
}

/// The body of an error transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorTxn {
    /// The error code; see [`ZkError`].
    pub err: i32,
}

/// The body of a check transaction. The version comparison happened before the transaction was
/// logged; applying it does not touch the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckVersionTxn {
    /// Path of the checked znode.
    pub path: String,
    /// The version that was expected.
    pub version: i32,
}

/// A transaction body.
#[derive(Clone, Debug, PartialEq)]
pub enum Txn {
    /// Create a znode.
    Create(CreateTxn),
    /// Create a znode, surfacing its stat in the result.
    Create2(CreateTxn),
    /// Create a TTL znode.
    CreateTtl(CreateTtlTxn),
    /// Create a container znode.
    CreateContainer(CreateContainerTxn),
    /// Delete a znode.
    Delete(DeleteTxn),
    /// Delete a container znode.
    DeleteContainer(DeleteTxn),
    /// Replace a znode's data.
    SetData(SetDataTxn),
    /// Rewrite the dynamic configuration node.
    Reconfig(SetDataTxn),
    /// Replace a znode's ACL.
    SetAcl(SetAclTxn),
    /// Remove every ephemeral owned by the closing session.
    CloseSession,
    /// A failed operation, or a rewritten sub-operation of a failed multi.
    Error(ErrorTxn),
    /// A version check that already happened; applied as a no-op.
    Check(CheckVersionTxn),
    /// An ordered batch applied as one unit.
    Multi(Vec<Txn>),
}

impl Txn {
    /// The opcode a transaction of this shape is logged with.
    pub fn op(&self) -> OpCode {
        match self {
            Txn::Create(_) => OpCode::Create,
            Txn::Create2(_) => OpCode::Create2,
            Txn::CreateTtl(_) => OpCode::CreateTtl,
            Txn::CreateContainer(_) => OpCode::CreateContainer,
            Txn::Delete(_) => OpCode::Delete,
            Txn::DeleteContainer(_) => OpCode::DeleteContainer,
            Txn::SetData(_) => OpCode::SetData,
            Txn::Reconfig(_) => OpCode::Reconfig,
            Txn::SetAcl(_) => OpCode::SetACL,
            Txn::CloseSession => OpCode::CloseSession,
            Txn::Error(_) => OpCode::Error,
            Txn::Check(_) => OpCode::Check,
            Txn::Multi(_) => OpCode::Multi,
        }
    }
}

/// The per-transaction outcome surfaced to the commit pipeline.
///
/// Equality and hashing are defined solely on `(client_id, cxid)`, so results can key a table
/// tracking request completion.
#[derive(Clone, Debug)]
pub struct ProcessTxnResult {
    /// The id of the session the transaction originated from.
    pub client_id: i64,
    /// The client-side sequence number of the originating request.
    pub cxid: i32,
    /// The transaction's zxid.
    pub zxid: i64,
    /// Outcome code; `0` is success, otherwise a [`ZkError`] value.
    pub err: i32,
    /// The operation kind.
    pub op: OpCode,
    /// The path the operation applied to, when it has one.
    pub path: String,
    /// The resulting stat, for the operations that surface one.
    pub stat: Option<Stat>,
    /// Sub-results of a multi, mirroring the order of its sub-transactions.
    pub multi_result: Option<Vec<ProcessTxnResult>>,
}

impl PartialEq for ProcessTxnResult {
    fn eq(&self, other: &ProcessTxnResult) -> bool {
        self.client_id == other.client_id && self.cxid == other.cxid
    }
}

impl Eq for ProcessTxnResult {}

impl Hash for ProcessTxnResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.client_id.hash(state);
        self.cxid.hash(state);
    }
}

impl DataTree {
    /// Apply one transaction to the tree.
    ///
    /// Must be called in zxid order from a single replay thread. Failures surface in the result's
    /// `err` field rather than as a `Result`: the commit pipeline applies every logged
    /// transaction and reports the outcome to the originating client.
    pub fn process_txn(&self, header: &TxnHeader, txn: &Txn) -> ProcessTxnResult {
        let mut rc = ProcessTxnResult {
            client_id: header.client_id,
            cxid: header.cxid,
            zxid: header.zxid,
            err: 0,
            op: header.op,
            path: String::new(),
            stat: None,
            multi_result: None,
        };

        match txn {
            Txn::Create(t) => {
                rc.path = t.path.clone();
                let owner = if t.ephemeral { header.client_id } else { 0 };
                match self.create_node(
                    &t.path,
                    t.data.clone(),
                    &t.acl,
                    owner,
                    t.parent_cversion,
                    header.zxid,
                    header.time,
                ) {
                    Ok(_) => {}
                    Err(e) => rc.err = ZkError::from(e) as i32,
                }
            }
            Txn::Create2(t) => {
                rc.path = t.path.clone();
                let owner = if t.ephemeral { header.client_id } else { 0 };
                match self.create_node(
                    &t.path,
                    t.data.clone(),
                    &t.acl,
                    owner,
                    t.parent_cversion,
                    header.zxid,
                    header.time,
                ) {
                    Ok(stat) => rc.stat = Some(stat),
                    Err(e) => rc.err = ZkError::from(e) as i32,
                }
            }
            Txn::CreateTtl(t) => {
                rc.path = t.path.clone();
                match self.create_node(
                    &t.path,
                    t.data.clone(),
                    &t.acl,
                    EphemeralType::ttl_to_ephemeral_owner(t.ttl),
                    t.parent_cversion,
                    header.zxid,
                    header.time,
                ) {
                    Ok(stat) => rc.stat = Some(stat),
                    Err(e) => rc.err = ZkError::from(e) as i32,
                }
            }
            Txn::CreateContainer(t) => {
                rc.path = t.path.clone();
                match self.create_node(
                    &t.path,
                    t.data.clone(),
                    &t.acl,
                    CONTAINER_EPHEMERAL_OWNER,
                    t.parent_cversion,
                    header.zxid,
                    header.time,
                ) {
                    Ok(stat) => rc.stat = Some(stat),
                    Err(e) => rc.err = ZkError::from(e) as i32,
                }
            }
            Txn::Delete(t) | Txn::DeleteContainer(t) => {
                rc.path = t.path.clone();
                if let Err(e) = self.delete_node(&t.path, header.zxid) {
                    rc.err = ZkError::from(e) as i32;
                }
            }
            Txn::SetData(t) | Txn::Reconfig(t) => {
                rc.path = t.path.clone();
                match self.set_data(&t.path, t.data.clone(), t.version, header.zxid, header.time) {
                    Ok(stat) => rc.stat = Some(stat),
                    Err(e) => rc.err = ZkError::from(e) as i32,
                }
            }
            Txn::SetAcl(t) => {
                rc.path = t.path.clone();
                match self.set_acl(&t.path, &t.acl, t.version) {
                    Ok(stat) => rc.stat = Some(stat),
                    Err(e) => rc.err = ZkError::from(e) as i32,
                }
            }
            Txn::CloseSession => {
                self.kill_session(header.client_id, header.zxid);
            }
            Txn::Error(t) => {
                rc.err = t.err;
            }
            Txn::Check(t) => {
                rc.path = t.path.clone();
            }
            Txn::Multi(txns) => {
                // Pre-scan: one error sub-record fails the whole batch, and every other
                // sub-record is rewritten to an error before being applied. Sub-records ahead of
                // the original marker report Ok, those behind it RuntimeInconsistency.
                let failed = txns.iter().any(|sub| matches!(sub, Txn::Error(_)));
                let mut post_failed = false;
                let mut results = Vec::with_capacity(txns.len());
                for sub in txns {
                    let is_error = matches!(sub, Txn::Error(_));
                    if is_error {
                        post_failed = true;
                    }
                    let effective: Cow<Txn> = if failed && !is_error {
                        let err = if post_failed {
                            ZkError::RuntimeInconsistency
                        } else {
                            ZkError::Ok
                        };
                        Cow::Owned(Txn::Error(ErrorTxn { err: err as i32 }))
                    } else {
                        Cow::Borrowed(sub)
                    };
                    let sub_header = TxnHeader {
                        client_id: header.client_id,
                        cxid: header.cxid,
                        zxid: header.zxid,
                        time: header.time,
                        op: effective.op(),
                    };
                    let sub_rc = self.process_txn(&sub_header, &*effective);
                    if sub_rc.err != 0 && rc.err == 0 {
                        rc.err = sub_rc.err;
                    }
                    results.push(sub_rc);
                }
                rc.multi_result = Some(results);
            }
        }

        // A snapshot may be streaming out while we mutate. Publishing the zxid only after the
        // mutation keeps a concurrent snapshot reader from associating a zxid with a tree state
        // that does not yet contain its transaction.
        if rc.zxid > self.last_processed_zxid.load(Ordering::Acquire) {
            self.last_processed_zxid.store(rc.zxid, Ordering::Release);
        }

        // Snapshots are taken lazily, so a parent can be captured before its children are
        // serialized; replaying the log on top of such a snapshot makes the child's create fail
        // with NodeExists. The parent's cversion/pzxid still have to advance as if the create had
        // applied.
        if header.op == OpCode::Create && rc.err == ZkError::NodeExists as i32 {
            if let Txn::Create(t) = txn {
                debug!(self.log, "adjusting parent cversion after replay collision";
                       "path" => %rc.path, "cversion" => t.parent_cversion);
                let (parent_name, _) = split_path(&rc.path);
                if let Err(e) = self.set_cversion_pzxid(parent_name, t.parent_cversion, header.zxid)
                {
                    error!(self.log, "failed to set parent cversion"; "path" => parent_name);
                    rc.err = ZkError::from(e) as i32;
                }
            }
        } else if rc.err != 0 {
            debug!(self.log, "transaction failed against the tree";
                   "op" => ?header.op, "err" => rc.err);
        }

        rc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error;
    use crate::types::{Acl, EphemeralType};

    fn header(op: OpCode, zxid: i64) -> TxnHeader {
        TxnHeader {
            client_id: 0x10,
            cxid: zxid as i32,
            zxid,
            time: 1000 + zxid,
            op,
        }
    }

    fn create_txn(path: &str, data: &[u8], ephemeral: bool) -> Txn {
        Txn::Create(CreateTxn {
            path: path.to_string(),
            data: data.to_vec(),
            acl: Acl::open_unsafe().to_vec(),
            ephemeral,
            parent_cversion: -1,
        })
    }

    #[test]
    fn create_and_delete_through_the_processor() {
        let tree = DataTree::new();
        let rc = tree.process_txn(&header(OpCode::Create, 1), &create_txn("/a", b"x", false));
        assert_eq!(rc.err, 0);
        assert_eq!(rc.path, "/a");
        assert_eq!(rc.stat, None, "plain create carries no stat");
        assert_eq!(tree.get_data("/a", None).unwrap().0, b"x");

        let rc = tree.process_txn(
            &header(OpCode::Delete, 2),
            &Txn::Delete(DeleteTxn {
                path: "/a".to_string(),
            }),
        );
        assert_eq!(rc.err, 0);
        assert_eq!(tree.get_data("/a", None), Err(error::GetData::NoNode));
    }

    #[test]
    fn create2_surfaces_the_stat() {
        let tree = DataTree::new();
        let rc = tree.process_txn(
            &header(OpCode::Create2, 7),
            &Txn::Create2(CreateTxn {
                path: "/a".to_string(),
                data: b"abc".to_vec(),
                acl: Acl::open_unsafe().to_vec(),
                ephemeral: false,
                parent_cversion: -1,
            }),
        );
        assert_eq!(rc.err, 0);
        let stat = rc.stat.unwrap();
        assert_eq!(stat.czxid, 7);
        assert_eq!(stat.data_length, 3);
    }

    #[test]
    fn ephemeral_create_tags_the_session() {
        let tree = DataTree::new();
        tree.process_txn(&header(OpCode::Create, 1), &create_txn("/e", b"", true));
        assert_eq!(
            tree.get_ephemerals(0x10),
            vec!["/e".to_string()].into_iter().collect()
        );

        let rc = tree.process_txn(&header(OpCode::CloseSession, 2), &Txn::CloseSession);
        assert_eq!(rc.err, 0);
        assert!(tree.get_ephemerals(0x10).is_empty());
        assert_eq!(tree.get_data("/e", None), Err(error::GetData::NoNode));
    }

    #[test]
    fn ttl_and_container_creates_classify_nodes() {
        let tree = DataTree::new();
        let rc = tree.process_txn(
            &header(OpCode::CreateTtl, 1),
            &Txn::CreateTtl(CreateTtlTxn {
                path: "/ttl".to_string(),
                data: vec![],
                acl: Acl::open_unsafe().to_vec(),
                parent_cversion: -1,
                ttl: 5000,
            }),
        );
        let owner = rc.stat.unwrap().ephemeral_owner;
        assert_eq!(EphemeralType::get(owner), EphemeralType::Ttl);
        assert_eq!(EphemeralType::ttl_of(owner), 5000);

        let rc = tree.process_txn(
            &header(OpCode::CreateContainer, 2),
            &Txn::CreateContainer(CreateContainerTxn {
                path: "/cont".to_string(),
                data: vec![],
                acl: Acl::open_unsafe().to_vec(),
                parent_cversion: -1,
            }),
        );
        let owner = rc.stat.unwrap().ephemeral_owner;
        assert_eq!(EphemeralType::get(owner), EphemeralType::Container);
        assert_eq!(
            tree.containers(),
            vec!["/cont".to_string()].into_iter().collect()
        );

        let rc = tree.process_txn(
            &header(OpCode::DeleteContainer, 3),
            &Txn::DeleteContainer(DeleteTxn {
                path: "/cont".to_string(),
            }),
        );
        assert_eq!(rc.err, 0);
        assert!(tree.containers().is_empty());
    }

    #[test]
    fn set_data_and_set_acl_through_the_processor() {
        let tree = DataTree::new();
        tree.process_txn(&header(OpCode::Create, 1), &create_txn("/a", b"1", false));

        let rc = tree.process_txn(
            &header(OpCode::SetData, 2),
            &Txn::SetData(SetDataTxn {
                path: "/a".to_string(),
                data: b"22".to_vec(),
                version: 1,
            }),
        );
        assert_eq!(rc.err, 0);
        assert_eq!(rc.stat.unwrap().version, 1);

        let rc = tree.process_txn(
            &header(OpCode::SetACL, 3),
            &Txn::SetAcl(SetAclTxn {
                path: "/a".to_string(),
                acl: Acl::read_unsafe().to_vec(),
                version: 1,
            }),
        );
        assert_eq!(rc.err, 0);
        assert_eq!(rc.stat.unwrap().aversion, 1);
        assert_eq!(tree.get_acl("/a").unwrap().0, Acl::read_unsafe().to_vec());
    }

    #[test]
    fn failures_surface_as_error_codes() {
        let tree = DataTree::new();
        let rc = tree.process_txn(
            &header(OpCode::Delete, 1),
            &Txn::Delete(DeleteTxn {
                path: "/missing".to_string(),
            }),
        );
        assert_eq!(ZkError::from(rc.err), ZkError::NoNode);

        tree.process_txn(&header(OpCode::Create, 2), &create_txn("/a", b"", false));
        let rc = tree.process_txn(&header(OpCode::Create2, 3), &{
            Txn::Create2(CreateTxn {
                path: "/a".to_string(),
                data: vec![],
                acl: Acl::open_unsafe().to_vec(),
                ephemeral: false,
                parent_cversion: -1,
            })
        });
        assert_eq!(ZkError::from(rc.err), ZkError::NodeExists);
    }

    #[test]
    fn check_is_a_tree_noop() {
        let tree = DataTree::new();
        tree.process_txn(&header(OpCode::Create, 1), &create_txn("/a", b"", false));
        let before = tree.stat_node("/a", None).unwrap();
        let rc = tree.process_txn(
            &header(OpCode::Check, 2),
            &Txn::Check(CheckVersionTxn {
                path: "/a".to_string(),
                version: 0,
            }),
        );
        assert_eq!(rc.err, 0);
        assert_eq!(rc.path, "/a");
        assert_eq!(tree.stat_node("/a", None).unwrap(), before);
    }

    #[test]
    fn multi_applies_all_or_nothing() {
        let tree = DataTree::new();
        let rc = tree.process_txn(
            &header(OpCode::Multi, 1),
            &Txn::Multi(vec![
                create_txn("/x", b"", false),
                create_txn("/y", b"", false),
            ]),
        );
        assert_eq!(rc.err, 0);
        let results = rc.multi_result.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|sub| sub.err == 0));
        assert!(tree.get_data("/x", None).is_ok());
        assert!(tree.get_data("/y", None).is_ok());
    }

    #[test]
    fn multi_with_midstream_error_rewrites_every_sub_txn() {
        let tree = DataTree::new();
        let marker = ZkError::NodeExists as i32;
        let rc = tree.process_txn(
            &header(OpCode::Multi, 1),
            &Txn::Multi(vec![
                create_txn("/x", b"", false),
                Txn::Error(ErrorTxn { err: marker }),
                create_txn("/y", b"", false),
            ]),
        );

        let results = rc.multi_result.as_ref().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].err, ZkError::Ok as i32);
        assert_eq!(results[1].err, marker);
        assert_eq!(results[2].err, ZkError::RuntimeInconsistency as i32);
        // The top-level error is the first non-zero sub-result.
        assert_eq!(rc.err, marker);

        // Nothing was applied.
        assert_eq!(tree.get_data("/x", None), Err(error::GetData::NoNode));
        assert_eq!(tree.get_data("/y", None), Err(error::GetData::NoNode));
    }

    #[test]
    fn replay_onto_lazily_captured_snapshot_repairs_parent() {
        // A snapshot captured /p (cversion 5, pzxid 50) after its child /p/c already existed, so
        // on restore the child is present before the log reaches its create.
        let tree = DataTree::new();
        tree.process_txn(
            &header(OpCode::Create, 49),
            &Txn::Create(CreateTxn {
                path: "/p".to_string(),
                data: vec![],
                acl: Acl::open_unsafe().to_vec(),
                ephemeral: false,
                parent_cversion: 5,
            }),
        );
        tree.process_txn(&header(OpCode::Create, 50), &create_txn("/p/c", b"", false));
        tree.set_cversion_pzxid("/p", 5, 50).unwrap();

        let rc = tree.process_txn(
            &header(OpCode::Create, 51),
            &Txn::Create(CreateTxn {
                path: "/p/c".to_string(),
                data: vec![],
                acl: Acl::open_unsafe().to_vec(),
                ephemeral: false,
                parent_cversion: 6,
            }),
        );
        assert_eq!(ZkError::from(rc.err), ZkError::NodeExists);
        let stat = tree.stat_node("/p", None).unwrap();
        assert_eq!(stat.cversion, 6);
        assert_eq!(stat.pzxid, 51);
    }

    #[test]
    fn last_processed_zxid_is_monotonic_and_published_after_apply() {
        let tree = DataTree::new();
        assert_eq!(tree.last_processed_zxid(), 0);
        tree.process_txn(&header(OpCode::Create, 5), &create_txn("/a", b"", false));
        assert_eq!(tree.last_processed_zxid(), 5);

        // A failing transaction with a smaller zxid must not move it backwards.
        tree.process_txn(
            &header(OpCode::Delete, 3),
            &Txn::Delete(DeleteTxn {
                path: "/missing".to_string(),
            }),
        );
        assert_eq!(tree.last_processed_zxid(), 5);

        tree.process_txn(&header(OpCode::Create, 9), &create_txn("/b", b"", false));
        assert_eq!(tree.last_processed_zxid(), 9);
    }

    #[test]
    fn results_key_on_client_and_cxid() {
        use std::collections::HashSet;

        let tree = DataTree::new();
        let a = tree.process_txn(&header(OpCode::Create, 1), &create_txn("/a", b"", false));
        let mut b = tree.process_txn(&header(OpCode::Create, 2), &create_txn("/b", b"", false));
        assert_ne!(a, b);
        b.cxid = a.cxid;
        assert_eq!(a, b, "equality ignores everything but (client_id, cxid)");

        let mut seen = HashSet::new();
        seen.insert(a);
        assert!(seen.contains(&b));
    }
}
