//! Applies a refresh cycle's reports to the rate store.
//!
//! Each successful report becomes one `upsert` keyed by source. Failed reports
//! are skipped: the stored record of a source that failed this cycle stays
//! exactly as it was. A store error on one source is recorded and the
//! remaining sources are still applied.

use metrics::counter;

use crate::ingest::types::ScrapeReport;
use crate::store::{RateRecord, RateStore};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Records written this cycle, as stored.
    pub committed: Vec<RateRecord>,
    /// (source, failure reason) of reports that carried no rate.
    pub skipped: Vec<(String, String)>,
    /// (source, error) of upserts the store rejected.
    pub store_errors: Vec<(String, String)>,
}

impl ReconcileSummary {
    pub fn committed_count(&self) -> usize {
        self.committed.len()
    }

    pub fn has_store_errors(&self) -> bool {
        !self.store_errors.is_empty()
    }
}

pub async fn apply(store: &dyn RateStore, reports: &[ScrapeReport]) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();

    for report in reports {
        let reading = match &report.outcome {
            Ok(reading) => reading,
            Err(e) => {
                summary
                    .skipped
                    .push((report.source.clone(), e.reason().to_string()));
                continue;
            }
        };

        match store.upsert(&reading.source, &reading.rate).await {
            Ok(record) => {
                tracing::debug!(target: "reconcile", source = %record.source, value = %record.value, "rate stored");
                summary.committed.push(record);
            }
            Err(e) => {
                tracing::error!(target: "reconcile", source = %reading.source, error = ?e, "rate upsert failed");
                counter!("reconcile_store_errors_total", "source" => reading.source.clone())
                    .increment(1);
                summary
                    .store_errors
                    .push((reading.source.clone(), format!("{e:#}")));
            }
        }
    }

    summary
}
