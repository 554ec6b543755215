//! Multi-source extraction behind per-source fault boundaries.
//!
//! Each source's stream is wrapped in a [`Guarded`] iterator. The first error
//! or panic ends that source: records it already yielded stay in the run, the
//! failure goes to a side channel, and the next source starts as if nothing
//! happened. Both extraction modes isolate panics the same way.

use crate::domain::model::{RawRecord, SourceFailure};
use crate::domain::ports::{RecordIter, Source};
use crate::utils::error::EtlError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

pub struct Guarded {
    source_name: String,
    inner: Option<RecordIter>,
    yielded: usize,
    failures: Sender<SourceFailure>,
}

impl Guarded {
    pub fn new(source_name: &str, inner: RecordIter, failures: Sender<SourceFailure>) -> Self {
        Self {
            source_name: source_name.to_string(),
            inner: Some(inner),
            yielded: 0,
            failures,
        }
    }

    fn fail(&mut self, error: EtlError) {
        self.inner = None;
        report(&self.failures, &self.source_name, error, self.yielded);
    }
}

impl Iterator for Guarded {
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        let inner = self.inner.as_mut()?;
        match panic::catch_unwind(AssertUnwindSafe(|| inner.next())) {
            Ok(Some(Ok(record))) => {
                self.yielded += 1;
                Some(record)
            }
            Ok(Some(Err(e))) => {
                self.fail(e);
                None
            }
            Err(payload) => {
                let error = EtlError::source_failed(&self.source_name, panic_message(payload));
                self.fail(error);
                None
            }
            Ok(None) => {
                tracing::debug!(
                    "Source '{}' finished with {} records",
                    self.source_name,
                    self.yielded
                );
                self.inner = None;
                None
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => format!("panicked: {}", message),
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => format!("panicked: {}", message),
            Err(_) => "panicked".to_string(),
        },
    }
}

fn report(failures: &Sender<SourceFailure>, source_name: &str, error: EtlError, kept: usize) {
    tracing::warn!(
        "Source '{}' failed after {} records: {}. Continuing with remaining sources.",
        source_name,
        kept,
        error
    );
    // The receiver only goes away once extraction results are discarded.
    let _ = failures.send(SourceFailure {
        source_name: source_name.to_string(),
        message: error.to_string(),
        records_kept: kept,
    });
}

/// Records of every source in declaration order, plus the failures seen.
pub struct Extraction {
    pub records: Box<dyn Iterator<Item = RawRecord> + Send>,
    failures: Receiver<SourceFailure>,
}

impl Extraction {
    /// Failures reported so far. Call after `records` is drained to see all of them.
    pub fn failures(&self) -> Vec<SourceFailure> {
        self.failures.try_iter().collect()
    }
}

/// `open` runs on its own task so a panicking source is reported like any
/// other failure.
async fn open_guarded(
    source: Arc<dyn Source>,
    failures: &Sender<SourceFailure>,
) -> Option<Guarded> {
    let name = source.name().to_string();
    tracing::info!("Extracting data from {}...", name);
    match tokio::spawn(async move { source.open().await }).await {
        Ok(Ok(inner)) => Some(Guarded::new(&name, inner, failures.clone())),
        Ok(Err(e)) => {
            report(failures, &name, e, 0);
            None
        }
        Err(e) => {
            report(failures, &name, EtlError::source_failed(&name, e), 0);
            None
        }
    }
}

/// Opens every source one after another. Rows are still pulled lazily, so
/// the caller drains `records` off the async workers.
pub async fn extract_all(sources: &[Arc<dyn Source>]) -> Extraction {
    let (tx, rx) = channel();
    let mut streams = Vec::with_capacity(sources.len());

    for source in sources {
        if let Some(stream) = open_guarded(Arc::clone(source), &tx).await {
            streams.push(stream);
        }
    }

    Extraction {
        records: Box::new(streams.into_iter().flatten()),
        failures: rx,
    }
}

/// Opens every source on its own task and drains it on the blocking pool.
/// Output keeps declaration order.
pub async fn extract_all_concurrent(sources: &[Arc<dyn Source>]) -> Extraction {
    let (tx, rx) = channel();

    let handles: Vec<_> = sources
        .iter()
        .map(|source| {
            let name = source.name().to_string();
            let source = Arc::clone(source);
            let tx = tx.clone();
            let handle = tokio::spawn(async move {
                match open_guarded(source, &tx).await {
                    Some(stream) => {
                        tokio::task::spawn_blocking(move || stream.collect::<Vec<_>>()).await
                    }
                    None => Ok(Vec::new()),
                }
            });
            (name, handle)
        })
        .collect();

    let mut batches = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        match handle.await {
            Ok(Ok(records)) => batches.push(records),
            Ok(Err(e)) | Err(e) => report(&tx, &name, EtlError::source_failed(&name, e), 0),
        }
    }

    Extraction {
        records: Box::new(batches.into_iter().flatten()),
        failures: rx,
    }
}
