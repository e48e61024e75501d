use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

define_id!(WorldId);
define_id!(LocationId);

/// Process-unique identity of anything placed into a live location.
///
/// `Wid::NONE` is never issued by [`WidGenerator`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Wid(u32);

impl Wid {
    pub const NONE: Wid = Wid(0);

    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for Wid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Issues [`Wid`]s for the whole server. Freed ids are never reused.
#[derive(Debug)]
pub struct WidGenerator {
    next: AtomicU32,
}

impl WidGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
        }
    }

    pub fn next(&self) -> Wid {
        Wid(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for WidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Content-level identity of an archetype, stable across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(Uuid);

impl ContentId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind prefixes that get their own namespace.
pub const CONTENT_KINDS: [&str; 6] = ["character", "weapon", "armor", "item", "tile", "door"];

/// Namespace table used to derive [`ContentId`]s from human names.
///
/// Built once at startup and handed to whatever needs to mint content ids.
#[derive(Debug, Clone)]
pub struct Namespaces {
    root: Uuid,
    kinds: HashMap<&'static str, Uuid>,
}

impl Namespaces {
    pub fn new(salt: &str) -> Self {
        let root = Uuid::new_v5(&Uuid::NAMESPACE_URL, salt.as_bytes());
        let kinds = CONTENT_KINDS
            .iter()
            .map(|kind| (*kind, Uuid::new_v5(&root, kind.as_bytes())))
            .collect();
        Self { root, kinds }
    }

    /// Hashes `kind:name` in the kind's namespace, or the whole string in the
    /// root namespace when the prefix is unknown.
    pub fn content_id(&self, name: &str) -> ContentId {
        if let Some((kind, rest)) = name.split_once(':') {
            if let Some(namespace) = self.kinds.get(kind) {
                return ContentId(Uuid::new_v5(namespace, rest.as_bytes()));
            }
        }
        ContentId(Uuid::new_v5(&self.root, name.as_bytes()))
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self::new("delver")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wid_generator_is_monotonic_and_skips_none() {
        let wids = WidGenerator::new();
        let first = wids.next();
        let second = wids.next();
        assert!(!first.is_none());
        assert_eq!(first.get() + 1, second.get());
    }

    #[test]
    fn test_content_id_is_stable_per_name() {
        let a = Namespaces::default();
        let b = Namespaces::default();
        assert_eq!(
            a.content_id("tile:cobblestone-floor"),
            b.content_id("tile:cobblestone-floor")
        );
    }

    #[test]
    fn test_kind_prefix_selects_namespace() {
        let ns = Namespaces::default();
        assert_ne!(ns.content_id("tile:stone"), ns.content_id("door:stone"));
        assert_ne!(ns.content_id("tile:stone"), ns.content_id("stone"));
    }

    #[test]
    fn test_salt_changes_ids() {
        let a = Namespaces::new("one");
        let b = Namespaces::new("two");
        assert_ne!(a.content_id("item:torch"), b.content_id("item:torch"));
    }
}
