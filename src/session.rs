//! The local-session upgrade control hook.
//!
//! Servers may track cheap *local* sessions that exist on a single node only. An ephemeral znode,
//! however, must be owned by a globally replicated session, because every replica has to agree on
//! when it dies. When a request from a local session would create an ephemeral (including one
//! buried inside a multi), the request processor calls [`check_upgrade_session`] first: the
//! session is upgraded through the tracker and a create-session record is replicated ahead of the
//! original request. The tree itself never sees local session ids on ephemeral creates.

use crate::error;
use crate::txn::OpCode;
use crate::types::{Acl, CreateMode};

/// The session tracker surface the upgrade hook needs.
///
/// Implemented by the surrounding server. `check_upgrade_session` is called from the request
/// processor thread only, so implementations do not need to defend against concurrent upgrades of
/// the same session from this path.
pub trait UpgradeableSessionTracker {
    /// True while `session_id` is tracked locally rather than replicated.
    fn is_local_session(&self, session_id: i64) -> bool;

    /// Promote `session_id` to a global session, returning its timeout in milliseconds for the
    /// replicated create-session record.
    fn upgrade_session(&self, session_id: i64) -> i32;
}

/// Just enough of a client request's shape for the hook to spot ephemeral creates.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientRequest {
    /// A create or create2 request.
    Create {
        /// Path of the znode to create.
        path: String,
        /// Initial data.
        data: Vec<u8>,
        /// Initial ACL.
        acl: Vec<Acl>,
        /// The requested creation mode.
        mode: CreateMode,
    },
    /// A multi request wrapping sub-requests.
    Multi(Vec<ClientRequest>),
    /// Any other request; never triggers an upgrade.
    Other(OpCode),
}

impl ClientRequest {
    fn contains_ephemeral_create(&self) -> bool {
        match self {
            ClientRequest::Create { mode, .. } => mode.is_ephemeral(),
            ClientRequest::Multi(requests) => requests
                .iter()
                .any(ClientRequest::contains_ephemeral_create),
            ClientRequest::Other(_) => false,
        }
    }
}

/// A create-session record to replicate ahead of the triggering request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UpgradeRequest {
    /// The session being promoted.
    pub session_id: i64,
    /// The session timeout, in milliseconds.
    pub timeout: i32,
}

/// Decide whether `request` from `session_id` requires the session to be upgraded first.
///
/// Returns `None` when no upgrade is needed: the request does not create an ephemeral, or the
/// session is already global. Returns the create-session record to replicate when it is. Fails
/// when the configuration forbids upgrading local sessions.
pub fn check_upgrade_session<T: UpgradeableSessionTracker + ?Sized>(
    tracker: &T,
    session_id: i64,
    request: &ClientRequest,
    upgrades_enabled: bool,
) -> Result<Option<UpgradeRequest>, error::UpgradeSession> {
    if !request.contains_ephemeral_create() || !tracker.is_local_session(session_id) {
        return Ok(None);
    }
    if !upgrades_enabled {
        return Err(error::UpgradeSession::EphemeralOnLocalSession);
    }
    Ok(Some(UpgradeRequest {
        session_id,
        timeout: tracker.upgrade_session(session_id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeTracker {
        local: i64,
        upgraded: Cell<bool>,
    }

    impl FakeTracker {
        fn new(local: i64) -> FakeTracker {
            FakeTracker {
                local,
                upgraded: Cell::new(false),
            }
        }
    }

    impl UpgradeableSessionTracker for FakeTracker {
        fn is_local_session(&self, session_id: i64) -> bool {
            session_id == self.local && !self.upgraded.get()
        }

        fn upgrade_session(&self, _session_id: i64) -> i32 {
            self.upgraded.set(true);
            30_000
        }
    }

    fn ephemeral_create() -> ClientRequest {
        ClientRequest::Create {
            path: "/e".to_string(),
            data: vec![],
            acl: Acl::open_unsafe().to_vec(),
            mode: CreateMode::Ephemeral,
        }
    }

    fn persistent_create() -> ClientRequest {
        ClientRequest::Create {
            path: "/p".to_string(),
            data: vec![],
            acl: Acl::open_unsafe().to_vec(),
            mode: CreateMode::Persistent,
        }
    }

    #[test]
    fn upgrades_local_session_on_ephemeral_create() {
        let tracker = FakeTracker::new(0x5);
        let upgraded = check_upgrade_session(&tracker, 0x5, &ephemeral_create(), true).unwrap();
        assert_eq!(
            upgraded,
            Some(UpgradeRequest {
                session_id: 0x5,
                timeout: 30_000,
            })
        );
        assert!(tracker.upgraded.get());
    }

    #[test]
    fn global_sessions_and_persistent_creates_pass_through() {
        let tracker = FakeTracker::new(0x5);
        // Not a local session.
        assert_eq!(
            check_upgrade_session(&tracker, 0x6, &ephemeral_create(), true).unwrap(),
            None
        );
        // Not an ephemeral create.
        assert_eq!(
            check_upgrade_session(&tracker, 0x5, &persistent_create(), true).unwrap(),
            None
        );
        assert_eq!(
            check_upgrade_session(&tracker, 0x5, &ClientRequest::Other(OpCode::SetData), true)
                .unwrap(),
            None
        );
        assert!(!tracker.upgraded.get());
    }

    #[test]
    fn finds_ephemeral_creates_buried_in_a_multi() {
        let tracker = FakeTracker::new(0x5);
        let multi = ClientRequest::Multi(vec![
            persistent_create(),
            ClientRequest::Multi(vec![ephemeral_create()]),
        ]);
        let upgraded = check_upgrade_session(&tracker, 0x5, &multi, true).unwrap();
        assert!(upgraded.is_some());
    }

    #[test]
    fn disabled_upgrades_reject_the_request() {
        let tracker = FakeTracker::new(0x5);
        assert_eq!(
            check_upgrade_session(&tracker, 0x5, &ephemeral_create(), false),
            Err(error::UpgradeSession::EphemeralOnLocalSession)
        );
        assert!(!tracker.upgraded.get());
    }
}
