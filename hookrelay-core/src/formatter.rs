//! Message formatting.
//!
//! The pipeline treats [`Payload`] as opaque. Formatting is the only place
//! that knows the outbound message shape.

use crate::config::ClassifierConfig;
use crate::events::{EventRecord, Payload, suppresses_identifier};
use hookrelay_sdk::objects::ChannelTag;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Longest description carried into a message, in characters.
pub const DESCRIPTION_LIMIT: usize = 200;

/// Entities listed in a high-value alert.
pub const ALERT_ENTITY_LIMIT: usize = 3;

/// Turns an event into the message for one channel.
pub trait PayloadFormatter: Send + Sync {
    /// Messages for channels where [`suppresses_identifier`] holds must not
    /// contain the event identifier or the server id.
    fn format(&self, record: &EventRecord, channel: ChannelTag, rules: &ClassifierConfig)
    -> Payload;
}

/// Formats Discord webhook embeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscordEmbedFormatter;

struct ChannelStyle {
    color: u32,
    emoji: &'static str,
    label: &'static str,
}

impl DiscordEmbedFormatter {
    pub fn new() -> Self {
        Self
    }

    fn style(channel: ChannelTag) -> ChannelStyle {
        match channel {
            ChannelTag::UltraHigh => ChannelStyle {
                color: 10181046,
                emoji: "💎",
                label: "ULTRA HIGH",
            },
            ChannelTag::Special => ChannelStyle {
                color: 16766720,
                emoji: "🔥",
                label: "SPECIAL",
            },
            ChannelTag::Normal => ChannelStyle {
                color: 5793266,
                emoji: "⭐",
                label: "NORMAL",
            },
            ChannelTag::HighValueAlert => ChannelStyle {
                color: 16711680,
                emoji: "👑",
                label: "HIGH VALUE ALERT",
            },
        }
    }

    fn players(record: &EventRecord) -> String {
        match record.capacity {
            Some(capacity) => format!("{}/{}", record.population, capacity),
            None => record.population.to_string(),
        }
    }

    fn timestamp() -> String {
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default()
    }

    fn channel_embed(record: &EventRecord, channel: ChannelTag) -> serde_json::Value {
        let style = Self::style(channel);
        let description = record
            .description
            .as_deref()
            .map(|d| truncate_chars(d, DESCRIPTION_LIMIT))
            .unwrap_or_default();
        let server_id = record.server_id.as_deref().unwrap_or("N/A");
        let server_id = if server_id.starts_with("```") {
            server_id.to_owned()
        } else {
            format!("```{server_id}```")
        };

        json!({
            "title": format!("{} {}", style.emoji, record.headline_name()),
            "description": description,
            "color": style.color,
            "fields": [{
                "name": "🌐 Info",
                "value": format!(
                    "**Players:** {}\n**Server ID:** {}\n**Found:** {}",
                    Self::players(record),
                    server_id,
                    record.total_found,
                ),
                "inline": false,
            }],
            "timestamp": Self::timestamp(),
            "footer": { "text": format!("Scanner • {}", style.label) },
        })
    }

    fn alert_embed(record: &EventRecord, rules: &ClassifierConfig) -> serde_json::Value {
        let style = Self::style(ChannelTag::HighValueAlert);
        let qualifying = |m: Option<f64>| m.is_some_and(|m| m >= rules.high_value_threshold);

        let mut description = String::from("🚨 **High value find detected!** 🚨\n\n");
        for (rank, entity) in record
            .entities
            .iter()
            .take(ALERT_ENTITY_LIMIT)
            .enumerate()
            .filter(|(_, e)| qualifying(e.magnitude))
        {
            description.push_str(&format!(
                "**#{}** - {}: **{}**\n",
                rank + 1,
                entity.name.as_deref().unwrap_or("Unknown"),
                entity.rate.as_deref().unwrap_or("0/s"),
            ));
        }

        let strongest = record.strongest_entity();
        json!({
            "title": format!(
                "{} {}",
                style.emoji,
                strongest.and_then(|e| e.name.as_deref()).unwrap_or("Unknown"),
            ),
            "description": description,
            "color": style.color,
            "fields": [
                {
                    "name": "👥 Players",
                    "value": format!("**{}**", Self::players(record)),
                    "inline": true,
                },
                {
                    "name": "📊 Top rate",
                    "value": format!(
                        "**{}**",
                        strongest.and_then(|e| e.rate.as_deref()).unwrap_or("0/s"),
                    ),
                    "inline": true,
                },
            ],
            "timestamp": Self::timestamp(),
            "footer": { "text": style.label },
        })
    }
}

impl PayloadFormatter for DiscordEmbedFormatter {
    fn format(
        &self,
        record: &EventRecord,
        channel: ChannelTag,
        rules: &ClassifierConfig,
    ) -> Payload {
        let embed = if suppresses_identifier(channel) {
            Self::alert_embed(record, rules)
        } else {
            Self::channel_embed(record, channel)
        };
        Payload::new(json!({ "embeds": [embed] }))
    }
}

fn truncate_chars(s: &str, limit: usize) -> String {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => s[..idx].to_owned(),
        None => s.to_owned(),
    }
}
