/// The `ephemeral_owner` value reserved for container znodes.
pub const CONTAINER_EPHEMERAL_OWNER: i64 = i64::MIN;

const TTL_MASK: i64 = 0xff00_0000_0000_0000_u64 as i64;

/// The largest TTL, in milliseconds, that fits in the owner encoding.
pub const MAX_TTL: i64 = !TTL_MASK;

/// Lifecycle class of a znode, encoded in its `ephemeral_owner` stat field.
///
/// The owner field is a tagged 64-bit integer: zero marks a plain persistent znode, a positive
/// value is the id of the owning session, [`CONTAINER_EPHEMERAL_OWNER`] marks a container, and any
/// other negative value carries a TTL in its low 56 bits.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EphemeralType {
    /// Not ephemeral: a plain persistent znode.
    Void,
    /// An ordinary ephemeral znode, owned by the session whose id is the owner value.
    Normal,
    /// A container znode, deletable by the server once it has been emptied of children.
    Container,
    /// A persistent znode that expires after its TTL if childless and unmodified.
    Ttl,
}

impl EphemeralType {
    /// Decode the lifecycle class from an `ephemeral_owner` value.
    pub fn get(ephemeral_owner: i64) -> EphemeralType {
        if ephemeral_owner == CONTAINER_EPHEMERAL_OWNER {
            EphemeralType::Container
        } else if ephemeral_owner < 0 {
            EphemeralType::Ttl
        } else if ephemeral_owner == 0 {
            EphemeralType::Void
        } else {
            EphemeralType::Normal
        }
    }

    /// Encode a TTL in milliseconds as an `ephemeral_owner` value.
    ///
    /// # Panics
    ///
    /// If `ttl` is not in `1..=MAX_TTL`.
    pub fn ttl_to_ephemeral_owner(ttl: i64) -> i64 {
        assert!(
            ttl > 0 && ttl <= MAX_TTL,
            "ttl must be positive and no larger than {}: {}",
            MAX_TTL,
            ttl
        );
        TTL_MASK | ttl
    }

    /// Extract the TTL in milliseconds from an `ephemeral_owner` value, or `0` for non-TTL nodes.
    pub fn ttl_of(ephemeral_owner: i64) -> i64 {
        if let EphemeralType::Ttl = EphemeralType::get(ephemeral_owner) {
            ephemeral_owner & MAX_TTL
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_owner_values() {
        assert_eq!(EphemeralType::get(0), EphemeralType::Void);
        assert_eq!(EphemeralType::get(1), EphemeralType::Normal);
        assert_eq!(EphemeralType::get(0xbadfaced), EphemeralType::Normal);
        assert_eq!(
            EphemeralType::get(CONTAINER_EPHEMERAL_OWNER),
            EphemeralType::Container
        );
        assert_eq!(EphemeralType::get(-1), EphemeralType::Ttl);
    }

    #[test]
    fn ttl_round_trips() {
        for &ttl in &[1, 100, 30_000, MAX_TTL] {
            let owner = EphemeralType::ttl_to_ephemeral_owner(ttl);
            assert_eq!(EphemeralType::get(owner), EphemeralType::Ttl);
            assert_eq!(EphemeralType::ttl_of(owner), ttl);
        }
    }

    #[test]
    fn ttl_of_ignores_other_classes() {
        assert_eq!(EphemeralType::ttl_of(0), 0);
        assert_eq!(EphemeralType::ttl_of(42), 0);
        assert_eq!(EphemeralType::ttl_of(CONTAINER_EPHEMERAL_OWNER), 0);
    }

    #[test]
    #[should_panic(expected = "ttl must be positive")]
    fn rejects_zero_ttl() {
        EphemeralType::ttl_to_ephemeral_owner(0);
    }
}
