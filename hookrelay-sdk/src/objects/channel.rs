use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Outbound channels a relayed event can be dispatched to.
///
/// Each tag maps to exactly one external webhook target.
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelTag {
    Normal,
    Special,
    UltraHigh,
    HighValueAlert,
}

impl ChannelTag {
    /// Every tag, in dispatch priority order (lowest first).
    pub const ALL: [ChannelTag; 4] = [
        ChannelTag::Normal,
        ChannelTag::Special,
        ChannelTag::UltraHigh,
        ChannelTag::HighValueAlert,
    ];

    /// Stable position of the tag inside [`ChannelTag::ALL`].
    pub const fn index(self) -> usize {
        match self {
            ChannelTag::Normal => 0,
            ChannelTag::Special => 1,
            ChannelTag::UltraHigh => 2,
            ChannelTag::HighValueAlert => 3,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ChannelTag::Normal => "NORMAL",
            ChannelTag::Special => "SPECIAL",
            ChannelTag::UltraHigh => "ULTRA_HIGH",
            ChannelTag::HighValueAlert => "HIGH_VALUE_ALERT",
        }
    }
}

impl std::fmt::Display for ChannelTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known [`ChannelTag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChannelTag(pub String);

impl std::fmt::Display for UnknownChannelTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown channel tag: {}", self.0)
    }
}

impl std::error::Error for UnknownChannelTag {}

impl std::str::FromStr for ChannelTag {
    type Err = UnknownChannelTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelTag::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownChannelTag(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_string_forms_agree() {
        for tag in ChannelTag::ALL {
            let json = serde_json::to_string(&tag).unwrap();
            assert_eq!(json, format!("\"{}\"", tag.as_str()));
            assert_eq!(tag.as_str().parse::<ChannelTag>().unwrap(), tag);
            assert_eq!(ChannelTag::ALL[tag.index()], tag);
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!("BRAINROT".parse::<ChannelTag>().is_err());
        assert!(serde_json::from_str::<ChannelTag>("\"VIP\"").is_err());
        assert_eq!(
            "ultra_high".parse::<ChannelTag>().unwrap(),
            ChannelTag::UltraHigh
        );
    }
}
