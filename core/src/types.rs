//! Core types and identifiers used throughout the engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Opaque structured payload exchanged with the peer.
///
/// Configuration and reply documents are passed through unchanged; the engine
/// never inspects their contents.
pub type Document = serde_json::Value;

/// Identity of one live peer session
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", &self.0.simple().to_string()[..8])
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.simple().to_string()[..8])
    }
}

/// Set of capability identifiers (schema URIs).
///
/// Ordered so that rendering is stable: `[a, b, c]`. Only membership matters
/// for comparisons.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<String>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn insert(&mut self, capability: impl Into<String>) -> bool {
        self.0.insert(capability.into())
    }

    pub fn contains(&self, capability: &str) -> bool {
        self.0.contains(capability)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// True when every identifier in `self` is advertised by `available`
    pub fn is_satisfied_by(&self, available: &CapabilitySet) -> bool {
        self.0.is_subset(&available.0)
    }

    /// Identifiers of `self` that `available` does not advertise (`self − available`)
    pub fn missing_from(&self, available: &CapabilitySet) -> CapabilitySet {
        Self(self.0.difference(&available.0).cloned().collect())
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl IntoIterator for CapabilitySet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, capability) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", capability)?;
        }
        write!(f, "]")
    }
}

/// Priority a handler reports for a document it can apply.
///
/// Higher wins. "Cannot handle" is expressed as `None` at the call site.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct HandlingPriority(pub u32);

impl HandlingPriority {
    pub const DEFAULT: HandlingPriority = HandlingPriority(1000);
    pub const MAX: HandlingPriority = HandlingPriority(u32::MAX);

    /// Raise the priority, saturating at [`HandlingPriority::MAX`]
    pub fn increase(self, by: u32) -> Self {
        Self(self.0.saturating_add(by))
    }
}

impl fmt::Display for HandlingPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A configuration snapshot awaiting push
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Sequence position among the snapshots handed to the worker
    pub position: u64,

    /// The document to apply
    pub document: Document,

    /// Capabilities the peer must advertise before the document is applied
    pub required: CapabilitySet,
}

impl ConfigSnapshot {
    pub fn new(position: u64, document: Document, required: CapabilitySet) -> Self {
        Self {
            position,
            document,
            required,
        }
    }

    pub fn required_capabilities(&self) -> &CapabilitySet {
        &self.required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_capability_set_display() {
        let caps: CapabilitySet = ["urn:b", "urn:a"].into_iter().collect();
        assert_eq!(caps.to_string(), "[urn:a, urn:b]");
        assert_eq!(CapabilitySet::new().to_string(), "[]");

        let single: CapabilitySet = ["cap1"].into_iter().collect();
        assert_eq!(single.to_string(), "[cap1]");
    }

    #[test]
    fn test_missing_from() {
        let required: CapabilitySet = ["cap1", "cap2"].into_iter().collect();
        let available: CapabilitySet = ["cap2", "cap3"].into_iter().collect();

        let missing = required.missing_from(&available);
        assert_eq!(missing, ["cap1"].into_iter().collect());
        assert!(!required.is_satisfied_by(&available));
    }

    #[test]
    fn test_empty_requirement_always_satisfied() {
        assert!(CapabilitySet::new().is_satisfied_by(&CapabilitySet::new()));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(HandlingPriority::DEFAULT.increase(1) > HandlingPriority::DEFAULT);
        assert_eq!(HandlingPriority::MAX.increase(5), HandlingPriority::MAX);
    }

    #[test]
    fn test_session_id_display_is_short() {
        let id = SessionId::new();
        assert_eq!(id.to_string().len(), 8);
    }

    proptest! {
        #[test]
        fn prop_missing_is_empty_iff_satisfied(
            required in proptest::collection::btree_set("[a-e]", 0..5),
            available in proptest::collection::btree_set("[a-e]", 0..5),
        ) {
            let required: CapabilitySet = required.into_iter().collect();
            let available: CapabilitySet = available.into_iter().collect();
            let missing = required.missing_from(&available);

            prop_assert_eq!(missing.is_empty(), required.is_satisfied_by(&available));
            for capability in missing.iter() {
                prop_assert!(required.contains(capability));
                prop_assert!(!available.contains(capability));
            }
        }
    }
}
