use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use super::{RateRecord, RateStore};

/// In-process store for tests and throwaway runs.
#[derive(Debug, Default)]
pub struct MemoryRateStore {
    inner: RwLock<BTreeMap<String, RateRecord>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with existing records, e.g. state left by an earlier cycle.
    pub fn with_records(records: impl IntoIterator<Item = RateRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.source.clone(), r))
            .collect();
        Self {
            inner: RwLock::new(map),
        }
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn find_all(&self) -> Result<Vec<RateRecord>> {
        let map = self
            .inner
            .read()
            .map_err(|_| anyhow!("rate store lock poisoned"))?;
        Ok(map.values().cloned().collect())
    }

    async fn upsert(&self, source: &str, value: &str) -> Result<RateRecord> {
        let record = RateRecord {
            source: source.to_string(),
            value: value.to_string(),
            observed_at: Utc::now(),
        };
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow!("rate store lock poisoned"))?;
        map.insert(record.source.clone(), record.clone());
        Ok(record)
    }
}
