//! Persisted rates, one record per source.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use memory::MemoryRateStore;
pub use sqlite::SqliteRateStore;

/// Latest observed rate of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRecord {
    pub source: String,
    pub value: String,
    /// Stamped by the store at write time.
    pub observed_at: DateTime<Utc>,
}

#[async_trait]
pub trait RateStore: Send + Sync {
    /// Every record, ordered by source.
    async fn find_all(&self) -> Result<Vec<RateRecord>>;

    /// Replace the record keyed by `source` (value and timestamp together) or
    /// insert it. Returns the record as stored.
    async fn upsert(&self, source: &str, value: &str) -> Result<RateRecord>;
}
