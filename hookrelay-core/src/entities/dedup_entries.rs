use crate::dedup::{DedupEntry, DedupKey, DedupMeta, Namespace};
use crate::framework::DatabaseProcessor;
use hookrelay_sdk::objects::ChannelTag;
use kanau::processor::Processor;
use time::OffsetDateTime;

/// A row of the `dedup_entries` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DedupEntryRow {
    pub namespace: String,
    pub event_id: String,
    pub created_at: OffsetDateTime,
    pub channel: Option<String>,
    pub category: Option<String>,
}

impl DedupEntryRow {
    /// Convert into a dedup entry.
    ///
    /// Returns `None` for rows with an unknown namespace. An unknown channel
    /// name is dropped from the metadata instead.
    pub fn into_entry(self) -> Option<DedupEntry> {
        let namespace = Namespace::parse(&self.namespace)?;
        let channel = self
            .channel
            .as_deref()
            .and_then(|c| c.parse::<ChannelTag>().ok());
        Some(DedupEntry {
            key: DedupKey::new(namespace, self.event_id),
            created_at: self.created_at,
            meta: DedupMeta {
                channel,
                category: self.category.map(Into::into),
            },
        })
    }
}

#[derive(Debug, Clone)]
/// Insert an entry, or restart the window of an existing one.
pub struct UpsertDedupEntry {
    pub entry: DedupEntry,
}

impl Processor<UpsertDedupEntry> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:UpsertDedupEntry")]
    async fn process(&self, query: UpsertDedupEntry) -> Result<(), sqlx::Error> {
        let entry = query.entry;
        sqlx::query(
            r#"
            INSERT INTO dedup_entries (namespace, event_id, created_at, channel, category)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (namespace, event_id) DO UPDATE
            SET created_at = EXCLUDED.created_at,
                channel = EXCLUDED.channel,
                category = EXCLUDED.category
            "#,
        )
        .bind(entry.key.namespace.as_str())
        .bind(entry.key.event_id.as_str())
        .bind(entry.created_at)
        .bind(entry.meta.channel.map(|c| c.as_str()))
        .bind(entry.meta.category.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
/// Entries of a namespace created strictly after `cutoff`.
pub struct ListLiveDedupEntries {
    pub namespace: Namespace,
    pub cutoff: OffsetDateTime,
}

impl Processor<ListLiveDedupEntries> for DatabaseProcessor {
    type Output = Vec<DedupEntryRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListLiveDedupEntries")]
    async fn process(
        &self,
        query: ListLiveDedupEntries,
    ) -> Result<Vec<DedupEntryRow>, sqlx::Error> {
        sqlx::query_as::<_, DedupEntryRow>(
            r#"
            SELECT namespace, event_id, created_at, channel, category
            FROM dedup_entries
            WHERE namespace = $1 AND created_at > $2
            "#,
        )
        .bind(query.namespace.as_str())
        .bind(query.cutoff)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Delete entries of a namespace created at or before `cutoff`.
///
/// Returns the number of deleted rows.
pub struct DeleteExpiredDedupEntries {
    pub namespace: Namespace,
    pub cutoff: OffsetDateTime,
}

impl Processor<DeleteExpiredDedupEntries> for DatabaseProcessor {
    type Output = u64;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:DeleteExpiredDedupEntries")]
    async fn process(&self, query: DeleteExpiredDedupEntries) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM dedup_entries
            WHERE namespace = $1 AND created_at <= $2
            "#,
        )
        .bind(query.namespace.as_str())
        .bind(query.cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
/// The newest entries of a namespace, newest first.
pub struct ListRecentDedupEntries {
    pub namespace: Namespace,
    pub limit: i64,
}

impl Processor<ListRecentDedupEntries> for DatabaseProcessor {
    type Output = Vec<DedupEntryRow>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:ListRecentDedupEntries")]
    async fn process(
        &self,
        query: ListRecentDedupEntries,
    ) -> Result<Vec<DedupEntryRow>, sqlx::Error> {
        sqlx::query_as::<_, DedupEntryRow>(
            r#"
            SELECT namespace, event_id, created_at, channel, category
            FROM dedup_entries
            WHERE namespace = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(query.namespace.as_str())
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(namespace: &str, channel: Option<&str>) -> DedupEntryRow {
        DedupEntryRow {
            namespace: namespace.into(),
            event_id: "A1".into(),
            created_at: OffsetDateTime::UNIX_EPOCH,
            channel: channel.map(Into::into),
            category: Some("VIP".into()),
        }
    }

    #[test]
    fn test_row_into_entry() {
        let entry = row("high_value", Some("HIGH_VALUE_ALERT")).into_entry().unwrap();
        assert_eq!(entry.key, DedupKey::high_value("A1"));
        assert_eq!(entry.meta.channel, Some(ChannelTag::HighValueAlert));
        assert_eq!(entry.meta.category.as_deref(), Some("VIP"));
    }

    #[test]
    fn test_unknown_namespace_is_skipped() {
        assert!(row("legacy", None).into_entry().is_none());
    }

    #[test]
    fn test_unknown_channel_is_dropped() {
        let entry = row("primary", Some("PURPLE")).into_entry().unwrap();
        assert_eq!(entry.meta.channel, None);
    }
}
