//! Event reports as posted by the game-server scanner.
//!
//! Field names follow the scanner's wire format. Everything except the
//! identifier is optional so that partially filled reports still reach the
//! relay; validation happens in the core.

use serde::{Deserialize, Deserializer, Serialize};

/// A single scan result submitted to `POST /webhook-filter`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventReport {
    /// Scanner-side identifier of the server occurrence.
    #[serde(default)]
    pub job_id: Option<String>,
    /// Current player count.
    #[serde(default)]
    pub players: u32,
    #[serde(default)]
    pub max_players: Option<u32>,
    /// Scanner category label (`NORMAL`, `VIP`, `EVENT`, ...).
    #[serde(default)]
    pub category: Option<String>,
    /// Webhook the scanner would have picked. Informational only; the relay
    /// classifies on its own.
    #[serde(default)]
    pub webhook_type: Option<String>,
    #[serde(default)]
    pub server_id: Option<String>,
    #[serde(default)]
    pub total_found: u32,
    #[serde(default, deserialize_with = "deserialize_embed_info")]
    pub embed_info: EmbedInfo,
}

/// Descriptive block attached to a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedInfo {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(
        default,
        rename = "highest_brainrot",
        deserialize_with = "deserialize_entity"
    )]
    pub highest: Option<ReportedEntity>,
    /// Entries that are not entity objects are skipped.
    #[serde(
        default,
        rename = "top_brainrots",
        deserialize_with = "deserialize_entities"
    )]
    pub top_entities: Vec<ReportedEntity>,
}

/// A scored sub-entity found on the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportedEntity {
    #[serde(default, deserialize_with = "deserialize_label")]
    pub name: Option<String>,
    /// Raw magnitude. Scanners send numbers, numeric strings or garbage.
    #[serde(default, rename = "numericGen")]
    pub numeric_gen: Option<serde_json::Value>,
    /// Human readable rate, e.g. `"150M/s"`.
    #[serde(
        default,
        rename = "valuePerSecond",
        deserialize_with = "deserialize_label"
    )]
    pub value_per_second: Option<String>,
}

impl ReportedEntity {
    /// Interpret the raw magnitude.
    ///
    /// Returns `None` for anything that is not a finite, non-negative number.
    pub fn magnitude(&self) -> Option<f64> {
        let value = match self.numeric_gen.as_ref()? {
            serde_json::Value::Number(n) => n.as_f64()?,
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (value.is_finite() && value >= 0.0).then_some(value)
    }
}

fn deserialize_embed_info<'de, D>(deserializer: D) -> Result<EmbedInfo, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default())
}

fn deserialize_entity<'de, D>(deserializer: D) -> Result<Option<ReportedEntity>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn deserialize_entities<'de, D>(deserializer: D) -> Result<Vec<ReportedEntity>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Array(values)) => values,
        _ => return Ok(Vec::new()),
    };
    Ok(values
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

/// Accept strings, numbers and booleans; anything else reads as absent.
fn deserialize_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
