//! Strongly-typed ULID identifiers.
//!
//! All identifiers share one generic `Id<T>` implementation; the marker type
//! `T` exists only at compile time and keeps the different id families from
//! being mixed up. ULIDs are used because they sort by creation time and can
//! be generated on any worker without coordination.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait for id families. Provides the `Display` prefix.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic id. `T` is a zero-sized marker; `Id<Record>` and `Id<Entry>`
/// are distinct types even though both wrap a ULID.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Record {}

impl IdMarker for Record {
    fn prefix() -> &'static str {
        "rec-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entry {}

impl IdMarker for Entry {
    fn prefix() -> &'static str {
        "audit-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Claim {}

impl IdMarker for Claim {
    fn prefix() -> &'static str {
        "claim-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum User {}

impl IdMarker for User {
    fn prefix() -> &'static str {
        "user-"
    }
}

/// Identifier of an outbox record.
pub type RecordId = Id<Record>;

/// Identifier of an audit trail entry.
pub type EntryId = Id<Entry>;

/// Opaque token identifying one claim (lease) on a record.
pub type ClaimToken = Id<Claim>;

/// Owning account reference carried on each record.
pub type UserId = Id<User>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_their_prefix() {
        let record = RecordId::from_ulid(Ulid::new());
        let entry = EntryId::from_ulid(Ulid::new());
        let token = ClaimToken::from_ulid(Ulid::new());
        let user = UserId::from_ulid(Ulid::new());

        assert!(record.to_string().starts_with("rec-"));
        assert!(entry.to_string().starts_with("audit-"));
        assert!(token.to_string().starts_with("claim-"));
        assert!(user.to_string().starts_with("user-"));

        // Mixing families is a compile error, which is the whole point:
        // let _: RecordId = entry; // <- does not compile
    }

    #[test]
    fn ids_sort_by_creation_time() {
        let a = RecordId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = RecordId::from_ulid(Ulid::new());

        assert!(a < b);
    }

    #[test]
    fn ids_roundtrip_through_serde() {
        let id = RecordId::from_ulid(Ulid::new());
        let s = serde_json::to_string(&id).unwrap();
        let back: RecordId = serde_json::from_str(&s).unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn id_is_as_small_as_a_ulid() {
        use std::mem::size_of;
        assert_eq!(size_of::<RecordId>(), size_of::<Ulid>());
    }
}
