//! Channel target table.
//!
//! Maps every [`ChannelTag`] to its webhook. The table is total: building it
//! fails if a tag is missing or listed twice, so dispatch never has to handle
//! an unknown channel.

use hookrelay_sdk::objects::ChannelTag;
use thiserror::Error;
use url::Url;

/// Webhook endpoint for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTarget {
    pub url: Url,
    /// Overrides the webhook's display name.
    pub username: Option<String>,
    /// Overrides the webhook's avatar.
    pub avatar_url: Option<String>,
}

impl ChannelTarget {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            username: None,
            avatar_url: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelTableError {
    #[error("no target configured for channel {0}")]
    Missing(ChannelTag),
    #[error("channel {0} configured more than once")]
    Duplicate(ChannelTag),
}

/// One target per channel, indexed by [`ChannelTag::index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTargets {
    targets: [ChannelTarget; 4],
}

impl ChannelTargets {
    /// Build the table from `(tag, target)` pairs.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (ChannelTag, ChannelTarget)>,
    ) -> Result<Self, ChannelTableError> {
        let mut slots: [Option<ChannelTarget>; 4] = Default::default();
        for (tag, target) in entries {
            let slot = &mut slots[tag.index()];
            if slot.is_some() {
                return Err(ChannelTableError::Duplicate(tag));
            }
            *slot = Some(target);
        }

        let [normal, special, ultra_high, high_value_alert] = slots;
        Ok(Self {
            targets: [
                normal.ok_or(ChannelTableError::Missing(ChannelTag::Normal))?,
                special.ok_or(ChannelTableError::Missing(ChannelTag::Special))?,
                ultra_high.ok_or(ChannelTableError::Missing(ChannelTag::UltraHigh))?,
                high_value_alert.ok_or(ChannelTableError::Missing(ChannelTag::HighValueAlert))?,
            ],
        })
    }

    pub fn get(&self, tag: ChannelTag) -> &ChannelTarget {
        &self.targets[tag.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelTag, &ChannelTarget)> {
        ChannelTag::ALL.into_iter().map(|tag| (tag, self.get(tag)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(path: &str) -> ChannelTarget {
        ChannelTarget::new(Url::parse(&format!("https://hooks.example.com/{path}")).unwrap())
    }

    #[test]
    fn test_complete_table() {
        let table = ChannelTargets::from_entries(
            ChannelTag::ALL.map(|tag| (tag, target(tag.as_str()))),
        )
        .unwrap();
        assert_eq!(
            table.get(ChannelTag::UltraHigh).url.path(),
            "/ULTRA_HIGH"
        );
        assert_eq!(table.iter().count(), 4);
    }

    #[test]
    fn test_missing_channel() {
        let err = ChannelTargets::from_entries([
            (ChannelTag::Normal, target("n")),
            (ChannelTag::Special, target("s")),
            (ChannelTag::UltraHigh, target("u")),
        ])
        .unwrap_err();
        assert_eq!(err, ChannelTableError::Missing(ChannelTag::HighValueAlert));
    }

    #[test]
    fn test_duplicate_channel() {
        let err = ChannelTargets::from_entries([
            (ChannelTag::Normal, target("a")),
            (ChannelTag::Normal, target("b")),
        ])
        .unwrap_err();
        assert_eq!(err, ChannelTableError::Duplicate(ChannelTag::Normal));
    }
}
