use compact_str::CompactString;
use hookrelay_sdk::objects::ChannelTag;

/// Independent dedup namespaces.
///
/// The same event identifier can be live in both at once, each with its own
/// retention window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Keyed by event; guards the primary channel dispatch.
    Primary,
    /// Keyed by event; guards the high-value alert.
    HighValue,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Primary, Namespace::HighValue];

    /// Name stored in the ledger.
    pub const fn as_str(self) -> &'static str {
        match self {
            Namespace::Primary => "primary",
            Namespace::HighValue => "high_value",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.as_str() == value)
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub namespace: Namespace,
    pub event_id: CompactString,
}

impl DedupKey {
    pub fn new(namespace: Namespace, event_id: impl Into<CompactString>) -> Self {
        Self {
            namespace,
            event_id: event_id.into(),
        }
    }

    pub fn primary(event_id: impl Into<CompactString>) -> Self {
        Self::new(Namespace::Primary, event_id)
    }

    pub fn high_value(event_id: impl Into<CompactString>) -> Self {
        Self::new(Namespace::HighValue, event_id)
    }
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.event_id)
    }
}

/// What the key was accepted as. Persisted next to the key for the recent
/// listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupMeta {
    pub channel: Option<ChannelTag>,
    pub category: Option<CompactString>,
}

impl DedupMeta {
    pub fn new(channel: ChannelTag, category: Option<CompactString>) -> Self {
        Self {
            channel: Some(channel),
            category,
        }
    }
}

/// A dedup key with its creation time, as held by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupEntry {
    pub key: DedupKey,
    pub created_at: time::OffsetDateTime,
    pub meta: DedupMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_are_distinct_keys() {
        assert_ne!(DedupKey::primary("A1"), DedupKey::high_value("A1"));
        assert_eq!(DedupKey::high_value("A1").to_string(), "high_value:A1");
    }

    #[test]
    fn test_namespace_round_trip() {
        for ns in Namespace::ALL {
            assert_eq!(Namespace::parse(ns.as_str()), Some(ns));
        }
        assert_eq!(Namespace::parse("brainrot"), None);
    }
}
