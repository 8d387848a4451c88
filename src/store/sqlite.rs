use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};

use super::{RateRecord, RateStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS rates (
    source      TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    observed_at TEXT NOT NULL
)
"#;

/// SQLite-backed store. The connection lives behind a mutex and every call runs
/// on the blocking pool.
#[derive(Clone)]
pub struct SqliteRateStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRateStore {
    /// Open (or create) the database at `path`; `:memory:` opens a private
    /// in-memory database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = if path == Path::new(":memory:") {
            Connection::open_in_memory()?
        } else {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
            }
            Connection::open(path).with_context(|| format!("opening {}", path.display()))?
        };
        conn.execute_batch(SCHEMA).context("creating rates table")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| anyhow!("sqlite connection poisoned"))?;
            let conn: &Connection = &guard;
            f(conn)
        })
        .await
        .context("sqlite task panicked")?
    }
}

fn record_from_row(row: &Row) -> rusqlite::Result<RateRecord> {
    let raw_ts: String = row.get(2)?;
    let observed_at = DateTime::parse_from_rfc3339(&raw_ts)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(RateRecord {
        source: row.get(0)?,
        value: row.get(1)?,
        observed_at,
    })
}

#[async_trait]
impl RateStore for SqliteRateStore {
    async fn find_all(&self) -> Result<Vec<RateRecord>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT source, value, observed_at FROM rates ORDER BY source")?;
            let records = stmt
                .query_map([], record_from_row)?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
            Ok(records)
        })
        .await
    }

    async fn upsert(&self, source: &str, value: &str) -> Result<RateRecord> {
        let record = RateRecord {
            source: source.to_string(),
            value: value.to_string(),
            observed_at: Utc::now(),
        };
        let row = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                r#"
                INSERT INTO rates (source, value, observed_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(source) DO UPDATE SET
                    value = excluded.value,
                    observed_at = excluded.observed_at
                "#,
                params![
                    row.source,
                    row.value,
                    row.observed_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
                ],
            )
            .with_context(|| format!("upserting rate for {}", row.source))?;
            Ok(())
        })
        .await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_schema_is_created() {
        let store = SqliteRateStore::open(":memory:").unwrap();
        assert!(store.find_all().await.unwrap().is_empty());
    }
}
