use failure::Fail;

/// The stable error code taxonomy surfaced in
/// [`ProcessTxnResult::err`](crate::ProcessTxnResult) and on the wire.
#[repr(i32)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ZkError {
    /// Everything is OK.
    Ok = 0,
    /// This code is never returned from the server. It should not be used other than to indicate a
    /// range. Specifically error codes greater than this value are API errors (while values less
    /// than this indicate a system error.
    APIError = -100,
    /// Client authentication failed.
    AuthFailed = -115,
    /// Invalid arguments.
    BadArguments = -8,
    /// Version conflict in `set` operation. In case of reconfiguration: reconfig requested from
    /// config version X but last seen config has a different version Y.
    BadVersion = -103,
    /// Connection to the server has been lost.
    ConnectionLoss = -4,
    /// A data inconsistency was found.
    DataInconsistency = -3,
    /// Attempt to create ephemeral node on a local session.
    EphemeralOnLocalSession = -120,
    /// Invalid `Acl` specified.
    InvalidACL = -114,
    /// Invalid callback specified.
    InvalidCallback = -113,
    /// Error while marshalling or unmarshalling data.
    MarshallingError = -5,
    /// Not authenticated.
    NoAuth = -102,
    /// Ephemeral nodes may not have children.
    NoChildrenForEphemerals = -108,
    /// Request to create node that already exists.
    NodeExists = -110,
    /// Attempted to read a node that does not exist.
    NoNode = -101,
    /// The node has children.
    NotEmpty = -111,
    /// State-changing request is passed to read-only server.
    NotReadOnly = -119,
    /// Attempt to remove a non-existing watcher.
    NoWatcher = -121,
    /// Operation timeout.
    OperationTimeout = -7,
    /// A runtime inconsistency was found.
    RuntimeInconsistency = -2,
    /// The session has been expired by the server.
    SessionExpired = -112,
    /// Session moved to another server, so operation is ignored.
    SessionMoved = -118,
    /// System and server-side errors. This is never thrown by the server, it shouldn't be used
    /// other than to indicate a range. Specifically error codes greater than this value, but lesser
    /// than `APIError`, are system errors.
    SystemError = -1,
    /// Operation is unimplemented.
    Unimplemented = -6,
}

impl From<i32> for ZkError {
    fn from(code: i32) -> Self {
        match code {
            0 => ZkError::Ok,
            -100 => ZkError::APIError,
            -115 => ZkError::AuthFailed,
            -8 => ZkError::BadArguments,
            -103 => ZkError::BadVersion,
            -4 => ZkError::ConnectionLoss,
            -3 => ZkError::DataInconsistency,
            -120 => ZkError::EphemeralOnLocalSession,
            -114 => ZkError::InvalidACL,
            -113 => ZkError::InvalidCallback,
            -5 => ZkError::MarshallingError,
            -102 => ZkError::NoAuth,
            -108 => ZkError::NoChildrenForEphemerals,
            -110 => ZkError::NodeExists,
            -101 => ZkError::NoNode,
            -111 => ZkError::NotEmpty,
            -119 => ZkError::NotReadOnly,
            -121 => ZkError::NoWatcher,
            -7 => ZkError::OperationTimeout,
            -2 => ZkError::RuntimeInconsistency,
            -112 => ZkError::SessionExpired,
            -118 => ZkError::SessionMoved,
            -1 => ZkError::SystemError,
            -6 => ZkError::Unimplemented,
            _ => unreachable!("unknown error code {:x}", code),
        }
    }
}

/// Errors that may cause a create to fail.
///
/// The tree trusts its transactional inputs; validation failures such as a malformed path or an
/// invalid ACL are rejected by the request processor before a transaction is logged, so only the
/// structural failures below can surface here.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum Create {
    /// A node with the given `path` already exists.
    #[fail(display = "target node already exists")]
    NodeExists,

    /// The parent node of the given `path` does not exist.
    #[fail(display = "parent node of target does not exist")]
    NoNode,
}

impl From<Create> for ZkError {
    fn from(e: Create) -> ZkError {
        match e {
            Create::NodeExists => ZkError::NodeExists,
            Create::NoNode => ZkError::NoNode,
        }
    }
}

/// Errors that may cause a delete to fail.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum Delete {
    /// No node exists with the given `path`.
    #[fail(display = "target node does not exist")]
    NoNode,
}

impl From<Delete> for ZkError {
    fn from(e: Delete) -> ZkError {
        match e {
            Delete::NoNode => ZkError::NoNode,
        }
    }
}

/// Errors that may cause a `set_data` to fail.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum SetData {
    /// No node exists with the given `path`.
    #[fail(display = "target node does not exist")]
    NoNode,
}

impl From<SetData> for ZkError {
    fn from(e: SetData) -> ZkError {
        match e {
            SetData::NoNode => ZkError::NoNode,
        }
    }
}

/// Errors that may cause a `set_acl` to fail.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum SetAcl {
    /// No node exists with the given `path`.
    #[fail(display = "target node does not exist")]
    NoNode,
}

impl From<SetAcl> for ZkError {
    fn from(e: SetAcl) -> ZkError {
        match e {
            SetAcl::NoNode => ZkError::NoNode,
        }
    }
}

/// Errors that may cause a `get_acl` to fail.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum GetAcl {
    /// No node exists with the given `path`.
    #[fail(display = "target node does not exist")]
    NoNode,
}

/// Errors that may cause a `get_data`, `stat_node`, or `get_children` to fail.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum GetData {
    /// No node exists with the given `path`.
    #[fail(display = "target node does not exist")]
    NoNode,
}

/// Errors that may cause a local-session upgrade check to fail.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum UpgradeSession {
    /// The request would create an ephemeral znode on a local session, and upgrading local
    /// sessions to global ones is disabled.
    #[fail(display = "cannot create ephemeral node on a local session")]
    EphemeralOnLocalSession,
}

impl From<UpgradeSession> for ZkError {
    fn from(e: UpgradeSession) -> ZkError {
        match e {
            UpgradeSession::EphemeralOnLocalSession => ZkError::EphemeralOnLocalSession,
        }
    }
}
