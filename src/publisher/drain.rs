use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::dispatch::{DispatchError, DispatchRegistry};
use crate::record::OutboxRecord;
use crate::store::OutboxStore;

/// Tally of one publisher iteration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainResult {
    pub fetched: usize,
    pub delivered: usize,
    pub failed: usize,
    pub quarantined: usize,
}

/// Drains undelivered records and dispatches them to subscribers.
///
/// One iteration fetches a bounded batch in occurrence order and processes
/// it sequentially, persisting each record's outcome before moving to the
/// next, so a crash mid-batch leaves delivered records marked and failures
/// counted. A record that exhausts `max_retries` is quarantined. No error
/// escapes an iteration: delivery failures land in the record and the log,
/// never in the committing caller.
pub struct OutboxPublisher<S> {
    store: S,
    registry: Arc<DispatchRegistry>,
    batch_size: usize,
    max_retries: u32,
    dispatch_timeout: Option<Duration>,
}

impl<S> OutboxPublisher<S> {
    pub fn new(store: S, registry: Arc<DispatchRegistry>) -> Self {
        OutboxPublisher {
            store,
            registry,
            batch_size: 20,
            max_retries: 3,
            dispatch_timeout: None,
        }
    }

    /// Set the maximum records processed per iteration.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the number of failed attempts before a record is quarantined.
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Bound each record's dispatch so a hanging subscriber costs that
    /// record a failed attempt instead of stalling the loop.
    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: OutboxStore> OutboxPublisher<S> {
    /// Run one iteration: fetch, dispatch, account. Never panics the loop;
    /// a store failure is logged and left for the next poll.
    pub fn run_once(&self) -> DrainResult {
        let mut result = DrainResult::default();

        let records = match self.store.fetch_undelivered(self.batch_size, self.max_retries) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(error = %err, "outbox fetch failed, waiting for next poll");
                return result;
            }
        };
        result.fetched = records.len();

        for record in records {
            match self.dispatch_record(&record) {
                Ok(()) => match self.store.mark_delivered(record.id) {
                    Ok(()) => {
                        result.delivered += 1;
                        tracing::debug!(
                            record_id = record.id,
                            event_type = %record.event_type,
                            "record delivered"
                        );
                    }
                    Err(err) => {
                        tracing::warn!(record_id = record.id, error = %err, "failed to mark record delivered");
                    }
                },
                Err(err) => {
                    let detail = err.to_string();
                    if record.retry_count + 1 >= self.max_retries {
                        match self.store.quarantine(record.id, &detail) {
                            Ok(()) => {
                                result.quarantined += 1;
                                tracing::error!(
                                    record_id = record.id,
                                    event_type = %record.event_type,
                                    error = %detail,
                                    "record quarantined after exhausting retries"
                                );
                            }
                            Err(err) => {
                                tracing::warn!(record_id = record.id, error = %err, "failed to quarantine record");
                            }
                        }
                    } else {
                        match self.store.record_failure(record.id, &detail) {
                            Ok(retry_count) => {
                                result.failed += 1;
                                tracing::warn!(
                                    record_id = record.id,
                                    event_type = %record.event_type,
                                    retry_count,
                                    error = %detail,
                                    "delivery failed, will retry"
                                );
                            }
                            Err(err) => {
                                tracing::warn!(record_id = record.id, error = %err, "failed to record delivery failure");
                            }
                        }
                    }
                }
            }
        }

        result
    }

    fn dispatch_record(&self, record: &OutboxRecord) -> Result<(), DispatchError> {
        let Some(limit) = self.dispatch_timeout else {
            return self.registry.dispatch(&record.event_type, &record.payload);
        };

        let (tx, rx) = mpsc::channel();
        let registry = Arc::clone(&self.registry);
        let event_type = record.event_type.clone();
        let payload = record.payload.clone();
        thread::spawn(move || {
            let _ = tx.send(registry.dispatch(&event_type, &payload));
        });

        match rx.recv_timeout(limit) {
            Ok(result) => result,
            // The stalled call keeps its thread; the record is accounted
            // as a failed attempt and retried later.
            Err(_) => Err(DispatchError::Timeout {
                event_type: record.event_type.clone(),
                waited: limit,
            }),
        }
    }
}
