// SPDX-License-Identifier: MPL-2.0

//! Access control primitives: permission bits, ACL entries, well-known ACLs,
//! and the node create flags.

/// Permission bits carried by an [`AclEntry`].
pub mod perm {
    /// Permission to read a node's data.
    pub const READ: u32 = 1;
    /// Permission to write a node's data.
    pub const WRITE: u32 = 2;
    /// Permission to create children.
    pub const CREATE: u32 = 4;
    /// Permission to delete the node.
    pub const DELETE: u32 = 8;
    /// Permission to change the node's ACL.
    pub const ADMIN: u32 = 16;
    /// All permission bits set.
    pub const ALL: u32 = READ | WRITE | CREATE | DELETE | ADMIN;
}

/// Node creation flags, bitwise-or-able.
pub mod create_flag {
    /// The node is removed automatically when the creating session ends.
    pub const EPHEMERAL: u32 = 1;
    /// The server appends a monotonic sequence suffix to the requested path.
    pub const SEQUENCE: u32 = 2;
}

/// A single access control entry: a permission bitmask plus an identity string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    /// Bitwise-or of [`perm`] values.
    pub permissions: u32,
    /// Scheme-qualified identity, e.g. `"world:anyone"` or `"auth:"`.
    pub identity: String,
}

impl AclEntry {
    /// Construct a new ACL entry.
    pub fn new(permissions: u32, identity: impl Into<String>) -> Self {
        Self {
            permissions,
            identity: identity.into(),
        }
    }
}

/// An access control list: an ordered set of [`AclEntry`] values.
pub type Acl = Vec<AclEntry>;

/// All permissions granted to anyone, unauthenticated.
pub fn open_acl_unsafe() -> Acl {
    vec![AclEntry::new(perm::ALL, "world:anyone")]
}

/// Read-only access granted to anyone, unauthenticated.
pub fn read_acl_unsafe() -> Acl {
    vec![AclEntry::new(perm::READ, "world:anyone")]
}

/// All permissions granted only to the identity that created the node.
pub fn creator_all_acl() -> Acl {
    vec![AclEntry::new(perm::ALL, "auth:")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_acls_match_spec() {
        assert_eq!(open_acl_unsafe(), vec![AclEntry::new(perm::ALL, "world:anyone")]);
        assert_eq!(
            read_acl_unsafe(),
            vec![AclEntry::new(perm::READ, "world:anyone")]
        );
        assert_eq!(creator_all_acl(), vec![AclEntry::new(perm::ALL, "auth:")]);
    }

    #[test]
    fn permission_bits_are_distinct_powers_of_two() {
        let bits = [
            perm::READ,
            perm::WRITE,
            perm::CREATE,
            perm::DELETE,
            perm::ADMIN,
        ];
        for (i, a) in bits.iter().enumerate() {
            for (j, b) in bits.iter().enumerate() {
                if i != j {
                    assert_eq!(a & b, 0);
                }
            }
        }
        assert_eq!(perm::ALL, bits.iter().fold(0, |acc, b| acc | b));
    }
}
