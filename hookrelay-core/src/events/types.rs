//! Records flowing through the relay pipeline.
//!
//! An [`EventRecord`] is the validated, immutable form of a scanner report.
//! A [`DispatchJob`] is one formatted message bound for one channel.

use compact_str::CompactString;
use hookrelay_sdk::objects::{ChannelTag, EventReport, ReportedEntity};
use thiserror::Error;
use uuid::Uuid;

/// Why a report could not become an [`EventRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("report has no event identifier")]
    MissingIdentifier,
}

/// A scored sub-entity of an event.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntity {
    pub name: Option<String>,
    /// `None` when the scanner sent something that is not a usable number.
    pub magnitude: Option<f64>,
    /// Display form of the magnitude, e.g. `"200M/s"`.
    pub rate: Option<String>,
}

impl From<ReportedEntity> for ScoredEntity {
    fn from(entity: ReportedEntity) -> Self {
        Self {
            magnitude: entity.magnitude(),
            name: entity.name,
            rate: entity.value_per_second,
        }
    }
}

/// A validated event report.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    /// Unique per real-world occurrence. Never empty.
    pub id: CompactString,
    pub population: u32,
    pub capacity: Option<u32>,
    pub category: Option<CompactString>,
    pub entities: Vec<ScoredEntity>,
    /// Name of the entity the scanner flagged as the best find.
    pub headline: Option<String>,
    pub server_id: Option<String>,
    pub description: Option<String>,
    pub total_found: u32,
}

impl EventRecord {
    /// The entity with the largest well-formed magnitude.
    pub fn strongest_entity(&self) -> Option<&ScoredEntity> {
        self.entities
            .iter()
            .filter_map(|e| e.magnitude.map(|m| (m, e)))
            .max_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, e)| e)
    }

    /// Name to headline the event with.
    pub fn headline_name(&self) -> &str {
        self.headline
            .as_deref()
            .or_else(|| self.strongest_entity().and_then(|e| e.name.as_deref()))
            .unwrap_or("Unknown")
    }
}

impl TryFrom<EventReport> for EventRecord {
    type Error = ValidationError;

    fn try_from(report: EventReport) -> Result<Self, Self::Error> {
        let id = report
            .job_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(CompactString::from)
            .ok_or(ValidationError::MissingIdentifier)?;

        let category = report
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(CompactString::from);

        let embed = report.embed_info;
        Ok(Self {
            id,
            population: report.players,
            capacity: report.max_players,
            category,
            entities: embed.top_entities.into_iter().map(Into::into).collect(),
            headline: embed.highest.and_then(|h| h.name),
            server_id: report.server_id,
            description: embed.description,
            total_found: report.total_found,
        })
    }
}

/// A formatted message. Opaque to the pipeline; only the formatter builds it
/// and only the delivery reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload(serde_json::Value);

impl Payload {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_json(self) -> serde_json::Value {
        self.0
    }
}

/// One queued delivery.
#[derive(Debug, Clone)]
pub struct DispatchJob {
    /// Time-ordered id used to correlate enqueue and delivery logs.
    pub job_id: Uuid,
    pub channel: ChannelTag,
    pub event_id: CompactString,
    pub payload: Payload,
    /// The payload deliberately leaves out the event identifier. Jobs with
    /// this flag are tracked under the HIGH_VALUE dedup namespace.
    pub suppress_identifier: bool,
}

impl DispatchJob {
    pub fn new(channel: ChannelTag, event_id: CompactString, payload: Payload) -> Self {
        Self {
            job_id: Uuid::now_v7(),
            channel,
            event_id,
            payload,
            suppress_identifier: suppresses_identifier(channel),
        }
    }
}

/// Channels whose messages must not reveal the event identifier.
pub fn suppresses_identifier(channel: ChannelTag) -> bool {
    matches!(channel, ChannelTag::HighValueAlert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookrelay_sdk::objects::EmbedInfo;

    fn entity(name: &str, magnitude: serde_json::Value) -> ReportedEntity {
        ReportedEntity {
            name: Some(name.to_owned()),
            numeric_gen: Some(magnitude),
            value_per_second: None,
        }
    }

    #[test]
    fn test_missing_or_blank_identifier_rejected() {
        let report = EventReport::default();
        assert_eq!(
            EventRecord::try_from(report).unwrap_err(),
            ValidationError::MissingIdentifier
        );

        let report = EventReport {
            job_id: Some("   ".into()),
            ..Default::default()
        };
        assert!(EventRecord::try_from(report).is_err());
    }

    #[test]
    fn test_record_conversion() {
        let report = EventReport {
            job_id: Some(" A1 ".into()),
            players: 12,
            category: Some("vip".into()),
            embed_info: EmbedInfo {
                top_entities: vec![
                    entity("small", serde_json::json!(10)),
                    entity("broken", serde_json::json!("n/a")),
                    entity("big", serde_json::json!(900)),
                ],
                ..Default::default()
            },
            ..Default::default()
        };
        let record = EventRecord::try_from(report).unwrap();
        assert_eq!(record.id, "A1");
        assert_eq!(record.category.as_deref(), Some("vip"));
        assert_eq!(record.entities.len(), 3);
        assert_eq!(record.entities[1].magnitude, None);
        assert_eq!(record.headline_name(), "big");
    }

    #[test]
    fn test_job_flags_high_value_alert() {
        let job = DispatchJob::new(
            ChannelTag::HighValueAlert,
            "A1".into(),
            Payload::new(serde_json::Value::Null),
        );
        assert!(job.suppress_identifier);
        let job = DispatchJob::new(
            ChannelTag::Normal,
            "A1".into(),
            Payload::new(serde_json::Value::Null),
        );
        assert!(!job.suppress_identifier);
    }
}
