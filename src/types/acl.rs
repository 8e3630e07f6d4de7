use std::borrow::Cow;
use std::fmt;
use std::ops;

/// Describes the ability of a user to perform a certain action.
///
/// Permissions can be mixed together like integers with `|` and `&`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission(u32);

impl Permission {
    /// No permissions are set (server could have been configured without ACL support).
    pub const NONE: Permission = Permission(0b00000);

    /// You can access the data of a node and can list its children.
    pub const READ: Permission = Permission(0b00001);

    /// You can set the data of a node.
    pub const WRITE: Permission = Permission(0b00010);

    /// You can create a child node.
    pub const CREATE: Permission = Permission(0b00100);

    /// You can delete a child node (but not necessarily this one).
    pub const DELETE: Permission = Permission(0b01000);

    /// You can alter permissions on this node.
    pub const ADMIN: Permission = Permission(0b10000);

    /// You can do anything.
    pub const ALL: Permission = Permission(0b11111);

    pub(crate) fn from_raw(code: u32) -> Permission {
        Permission(code)
    }

    pub(crate) fn code(&self) -> u32 {
        self.0
    }

    /// Check that all permissions in `subset` are set.
    pub fn can(self, subset: Permission) -> bool {
        (self & subset) == subset
    }
}

impl ops::BitAnd for Permission {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Permission::from_raw(self.0 & rhs.0)
    }
}

impl ops::BitOr for Permission {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Permission::from_raw(self.0 | rhs.0)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if *self == Permission::ALL {
            write!(f, "all")
        } else if *self == Permission::NONE {
            write!(f, "none")
        } else {
            let mut first = true;
            let mut tick = |s| {
                if first {
                    first = false;
                    s
                } else {
                    "|"
                }
            };

            if self.can(Permission::READ) {
                write!(f, "{}read", tick(""))?;
            }
            if self.can(Permission::WRITE) {
                write!(f, "{}write", tick(""))?;
            }
            if self.can(Permission::CREATE) {
                write!(f, "{}create", tick(""))?;
            }
            if self.can(Permission::DELETE) {
                write!(f, "{}delete", tick(""))?;
            }
            if self.can(Permission::ADMIN) {
                write!(f, "{}admin", tick(""))?;
            }
            Ok(())
        }
    }
}

/// An access control list.
///
/// In ZooKeeper, the ACL of a znode is a list of `Acl` entries; the list is significant in order
/// and in full, so two lists with the same entries in a different order are distinct ACLs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Acl {
    /// The permissions associated with this ACL.
    pub perms: Permission,
    /// The scheme used to authenticate the user.
    pub scheme: Cow<'static, str>,
    /// An ID whose interpretation depends on the [`Acl::scheme`].
    pub id: Cow<'static, str>,
}

impl Acl {
    /// This ACL gives the creator's authentication ID all permissions.
    pub fn creator_all() -> &'static [Acl] {
        &ACL_CREATOR_ALL
    }

    /// This is a completely open ACL.
    pub fn open_unsafe() -> &'static [Acl] {
        &ACL_OPEN_UNSAFE
    }

    /// This ACL gives the world the ability to read.
    pub fn read_unsafe() -> &'static [Acl] {
        &ACL_READ_UNSAFE
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}:{}, {})", self.scheme, self.id, self.perms)
    }
}

const ACL_CREATOR_ALL: [Acl; 1] = [Acl {
    perms: Permission::ALL,
    scheme: Cow::Borrowed("auth"),
    id: Cow::Borrowed(""),
}];

const ACL_OPEN_UNSAFE: [Acl; 1] = [Acl {
    perms: Permission::ALL,
    scheme: Cow::Borrowed("world"),
    id: Cow::Borrowed("anyone"),
}];

const ACL_READ_UNSAFE: [Acl; 1] = [Acl {
    perms: Permission::READ,
    scheme: Cow::Borrowed("world"),
    id: Cow::Borrowed("anyone"),
}];
