//! Event classification.
//!
//! Every event gets exactly one primary channel. Independently of that, an
//! event with a sub-entity at or above the high-value threshold also goes to
//! [`ChannelTag::HighValueAlert`].

use crate::config::ClassifierConfig;
use crate::events::EventRecord;
use hookrelay_sdk::objects::ChannelTag;

/// The channels an event qualifies for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSet {
    primary: ChannelTag,
    high_value: bool,
}

impl ChannelSet {
    pub fn primary(&self) -> ChannelTag {
        self.primary
    }

    pub fn is_high_value(&self) -> bool {
        self.high_value
    }

    pub fn contains(&self, tag: ChannelTag) -> bool {
        tag == self.primary || (self.high_value && tag == ChannelTag::HighValueAlert)
    }

    /// Primary channel first, then the alert channel if present.
    pub fn iter(&self) -> impl Iterator<Item = ChannelTag> + use<> {
        std::iter::once(self.primary)
            .chain(self.high_value.then_some(ChannelTag::HighValueAlert))
    }

    pub fn len(&self) -> usize {
        1 + usize::from(self.high_value)
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Classify an event.
///
/// Primary channel, first match wins:
/// 1. population above the ceiling, or an ultra category: ULTRA_HIGH
/// 2. a special category: SPECIAL
/// 3. NORMAL
///
/// Entities without a usable magnitude are ignored.
pub fn classify(record: &EventRecord, rules: &ClassifierConfig) -> ChannelSet {
    let high_value = record
        .entities
        .iter()
        .filter_map(|e| e.magnitude)
        .any(|m| m >= rules.high_value_threshold);

    let category = record.category.as_deref();
    let primary = if record.population > rules.population_ceiling
        || category.is_some_and(|c| rules.is_ultra_category(c))
    {
        ChannelTag::UltraHigh
    } else if category.is_some_and(|c| rules.is_special_category(c)) {
        ChannelTag::Special
    } else {
        ChannelTag::Normal
    };

    ChannelSet {
        primary,
        high_value,
    }
}
