use crate::core::dedupe::{dedupe, DEFAULT_PARTITIONS};
use crate::core::extract::{extract_all, extract_all_concurrent};
use crate::core::normalize::normalize_all;
use crate::core::sync::Synchronizer;
use crate::domain::model::RunReport;
use crate::domain::ports::{DocumentStore, Source};
use crate::utils::error::Result;
use crate::utils::monitor::StageMonitor;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub collection: String,
    pub partitions: usize,
    pub concurrent_extract: bool,
    pub full_refresh: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            collection: "products".to_string(),
            partitions: DEFAULT_PARTITIONS,
            concurrent_extract: false,
            full_refresh: false,
        }
    }
}

/// Runs extract -> normalize -> dedupe -> sync against one store handle.
pub struct EtlEngine<S: DocumentStore> {
    sources: Vec<Arc<dyn Source>>,
    store: S,
    options: RunOptions,
    monitor: StageMonitor,
}

impl<S: DocumentStore> EtlEngine<S> {
    pub fn new(sources: Vec<Arc<dyn Source>>, store: S, options: RunOptions) -> Self {
        Self::new_with_monitoring(sources, store, options, false)
    }

    pub fn new_with_monitoring(
        sources: Vec<Arc<dyn Source>>,
        store: S,
        options: RunOptions,
        monitor_enabled: bool,
    ) -> Self {
        Self {
            sources,
            store,
            options,
            monitor: StageMonitor::new(monitor_enabled),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options_mut(&mut self) -> &mut RunOptions {
        &mut self.options
    }

    /// Source failures and rejected records are reported, not returned as
    /// errors. Only a store that cannot be read or written fails the run.
    /// The store handle is closed before returning either way.
    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("Starting ETL process...");
        let result = self.run_stages().await;
        let closed = self.store.close().await;
        self.monitor.log_final_stats();

        let report = result?;
        closed?;
        tracing::info!("ETL process completed successfully.");
        Ok(report)
    }

    async fn run_stages(&self) -> Result<RunReport> {
        let mut report = RunReport::default();

        let mut extraction = if self.options.concurrent_extract {
            extract_all_concurrent(&self.sources).await
        } else {
            extract_all(&self.sources).await
        };

        // Draining pulls file and row reads, so it runs on the blocking pool.
        let records = std::mem::replace(&mut extraction.records, Box::new(std::iter::empty()));
        let (normalized, extracted, rejected) = tokio::task::spawn_blocking(move || {
            let mut extracted = 0;
            let mut rejected = 0;
            let normalized: Vec<_> =
                normalize_all(records.inspect(|_| extracted += 1), &mut rejected).collect();
            (normalized, extracted, rejected)
        })
        .await?;
        report.extracted = extracted;
        report.rejected = rejected;
        report.normalized = normalized.len();
        report.source_failures = extraction.failures();
        tracing::info!(
            "Total transformed records: {} ({} rejected, {} sources failed)",
            report.normalized,
            report.rejected,
            report.source_failures.len()
        );
        self.monitor.log_stats("extract+normalize");

        let partitions = self.options.partitions;
        let deduped = tokio::task::spawn_blocking(move || dedupe(normalized, partitions)).await?;
        report.deduplicated = deduped.len();
        tracing::info!("Total deduplicated records: {}", report.deduplicated);
        self.monitor.log_stats("dedupe");

        tracing::info!("Loading data into collection '{}'...", self.options.collection);
        let summary = Synchronizer::new(&self.store, self.options.collection.as_str())
            .sync(deduped, self.options.full_refresh)
            .await?;
        report.summary = Some(summary);
        self.monitor.log_stats("sync");

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::MemoryStore;
    use crate::domain::model::RawRecord;
    use crate::domain::ports::RecordIter;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};

    /// Remembers which thread pulled each row.
    struct ThreadRecordingSource {
        pulls: Arc<Mutex<Vec<ThreadId>>>,
    }

    #[async_trait]
    impl Source for ThreadRecordingSource {
        fn name(&self) -> &str {
            "recording"
        }

        async fn open(&self) -> Result<RecordIter> {
            let pulls = Arc::clone(&self.pulls);
            Ok(Box::new((0..3).map(move |i| -> Result<RawRecord> {
                pulls.lock().unwrap().push(thread::current().id());
                Ok([
                    ("name", json!(format!("item {}", i))),
                    ("price", json!(1.0)),
                    ("category", json!("misc")),
                ]
                .into_iter()
                .collect())
            })))
        }
    }

    async fn pulling_threads(concurrent_extract: bool) -> Vec<ThreadId> {
        let pulls = Arc::new(Mutex::new(Vec::new()));
        let source: Arc<dyn Source> = Arc::new(ThreadRecordingSource {
            pulls: Arc::clone(&pulls),
        });
        let options = RunOptions {
            concurrent_extract,
            ..RunOptions::default()
        };

        let report = EtlEngine::new(vec![source], MemoryStore::new(), options)
            .run()
            .await
            .unwrap();
        assert_eq!(report.deduplicated, 3);

        let pulls = pulls.lock().unwrap();
        pulls.clone()
    }

    #[tokio::test]
    async fn test_rows_are_pulled_off_the_runtime_thread() {
        let runtime_thread = thread::current().id();

        for concurrent in [false, true] {
            let pulls = pulling_threads(concurrent).await;
            assert_eq!(pulls.len(), 3);
            assert!(pulls.iter().all(|id| *id != runtime_thread));
        }
    }
}
