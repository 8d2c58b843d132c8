use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use serde::de::DeserializeOwned;

use crate::aggregate::Aggregate;
use crate::error::StoreError;
use crate::record::OutboxRecord;

use super::outbox::OutboxStore;
use super::repository::Repository;

struct Row {
    state: String,
    version: u64,
}

#[derive(Default)]
struct Inner {
    rows: HashMap<String, Row>,
    outbox: Vec<OutboxRecord>,
    next_record_id: u64,
}

/// In-memory store with transactional commit semantics.
///
/// Rows and outbox records live behind one lock, so a commit applies both or
/// neither, the same guarantee a relational store gives via a transaction.
/// Cloning creates another handle to the same storage.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            inner: Arc::new(RwLock::new(Inner {
                rows: HashMap::new(),
                outbox: Vec::new(),
                next_record_id: 1,
            })),
        }
    }

    /// Number of records still awaiting delivery.
    pub fn undelivered_count(&self) -> Result<usize, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::LockPoisoned("undelivered_count"))?;
        Ok(inner
            .outbox
            .iter()
            .filter(|record| record.is_undelivered())
            .count())
    }

    fn update_record<T>(
        &self,
        id: u64,
        operation: &'static str,
        update: impl FnOnce(&mut OutboxRecord) -> T,
    ) -> Result<T, StoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::LockPoisoned(operation))?;
        let record = inner
            .outbox
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::NoSuchRecord(id))?;
        Ok(update(record))
    }
}

struct StagedAggregate {
    id: String,
    version: u64,
    state: String,
    events: Vec<StagedEvent>,
}

struct StagedEvent {
    event_type: String,
    payload: String,
    occurred_at: SystemTime,
}

impl Repository for MemoryStore {
    fn get<A>(&self, id: &str) -> Result<Option<A>, StoreError>
    where
        A: Aggregate + DeserializeOwned,
    {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::LockPoisoned("get"))?;

        let Some(row) = inner.rows.get(id) else {
            return Ok(None);
        };

        let mut aggregate: A =
            serde_json::from_str(&row.state).map_err(|err| StoreError::Serialization {
                id: id.to_string(),
                message: err.to_string(),
            })?;
        aggregate.entity_mut().set_id(id);
        aggregate.entity_mut().set_version(row.version);
        Ok(Some(aggregate))
    }

    fn commit<A: Aggregate>(&self, aggregate: &mut A) -> Result<(), StoreError> {
        self.commit_all(&mut [aggregate as &mut dyn Aggregate])
    }

    fn commit_all(&self, aggregates: &mut [&mut dyn Aggregate]) -> Result<(), StoreError> {
        // Serialize everything up front: a non-serializable row or payload
        // fails the whole operation before any state is touched.
        let mut staged = Vec::with_capacity(aggregates.len());
        for aggregate in aggregates.iter() {
            let entity = aggregate.entity();
            let state = aggregate.state().map_err(|err| StoreError::Serialization {
                id: entity.id().to_string(),
                message: err.to_string(),
            })?;

            let mut events = Vec::with_capacity(entity.raised().len());
            for captured in entity.raised() {
                let payload =
                    captured
                        .payload_json()
                        .map_err(|err| StoreError::Serialization {
                            id: entity.id().to_string(),
                            message: err.to_string(),
                        })?;
                events.push(StagedEvent {
                    event_type: captured.event_type().to_string(),
                    payload,
                    occurred_at: captured.occurred_at(),
                });
            }

            staged.push(StagedAggregate {
                id: entity.id().to_string(),
                version: entity.version(),
                state,
                events,
            });
        }

        {
            let mut inner = self
                .inner
                .write()
                .map_err(|_| StoreError::LockPoisoned("commit"))?;

            // Validate every version before applying anything; a conflict
            // rolls the whole operation back.
            for aggregate in &staged {
                let actual = inner
                    .rows
                    .get(&aggregate.id)
                    .map(|row| row.version)
                    .unwrap_or(0);
                if actual != aggregate.version {
                    return Err(StoreError::ConcurrentWrite {
                        id: aggregate.id.clone(),
                        expected: aggregate.version,
                        actual,
                    });
                }
            }

            for aggregate in staged {
                inner.rows.insert(
                    aggregate.id.clone(),
                    Row {
                        state: aggregate.state,
                        version: aggregate.version + 1,
                    },
                );

                for event in aggregate.events {
                    let id = inner.next_record_id;
                    inner.next_record_id += 1;
                    inner.outbox.push(OutboxRecord {
                        id,
                        aggregate_id: aggregate.id.clone(),
                        event_type: event.event_type,
                        payload: event.payload,
                        occurred_at: event.occurred_at,
                        processed_at: None,
                        retry_count: 0,
                        last_error: None,
                        failed_at: None,
                    });
                }
            }
        }

        // The append is durable; only now do buffers clear and versions bump.
        for aggregate in aggregates.iter_mut() {
            let entity = aggregate.entity_mut();
            let next = entity.version() + 1;
            entity.set_version(next);
            entity.clear_raised();
        }

        Ok(())
    }
}

impl OutboxStore for MemoryStore {
    fn fetch_undelivered(
        &self,
        max: usize,
        max_retries: u32,
    ) -> Result<Vec<OutboxRecord>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::LockPoisoned("fetch_undelivered"))?;

        let mut batch: Vec<OutboxRecord> = inner
            .outbox
            .iter()
            .filter(|record| record.is_undelivered() && record.retry_count < max_retries)
            .cloned()
            .collect();
        batch.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then(a.id.cmp(&b.id))
        });
        batch.truncate(max);
        Ok(batch)
    }

    fn mark_delivered(&self, id: u64) -> Result<(), StoreError> {
        self.update_record(id, "mark_delivered", |record| {
            record.processed_at = Some(SystemTime::now());
            record.last_error = None;
        })
    }

    fn record_failure(&self, id: u64, error: &str) -> Result<u32, StoreError> {
        self.update_record(id, "record_failure", |record| {
            record.retry_count += 1;
            record.last_error = Some(error.to_string());
            record.retry_count
        })
    }

    fn quarantine(&self, id: u64, error: &str) -> Result<(), StoreError> {
        self.update_record(id, "quarantine", |record| {
            record.retry_count += 1;
            record.last_error = Some(error.to_string());
            record.failed_at = Some(SystemTime::now());
        })
    }

    fn quarantined(&self) -> Result<Vec<OutboxRecord>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::LockPoisoned("quarantined"))?;
        Ok(inner
            .outbox
            .iter()
            .filter(|record| record.is_quarantined())
            .cloned()
            .collect())
    }

    fn peek_outbox(&self) -> Result<Vec<OutboxRecord>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::LockPoisoned("peek_outbox"))?;
        Ok(inner.outbox.clone())
    }
}
