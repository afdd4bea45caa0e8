pub mod dedup_entries;
