use crate::error::StoreError;
use crate::record::OutboxRecord;

/// Read-side store contract for the publisher loop.
///
/// Fetches never return delivered or quarantined records; outcome writes are
/// per record so a crash mid-batch loses nothing already marked.
pub trait OutboxStore: Send + Sync {
    /// Up to `max` undelivered records with `retry_count < max_retries`,
    /// ordered by occurrence (ties broken by append order).
    fn fetch_undelivered(
        &self,
        max: usize,
        max_retries: u32,
    ) -> Result<Vec<OutboxRecord>, StoreError>;

    /// Mark a record delivered: sets `processed_at`, clears `last_error`.
    fn mark_delivered(&self, id: u64) -> Result<(), StoreError>;

    /// Account a failed attempt: increments `retry_count`, stores the error.
    /// Returns the new retry count.
    fn record_failure(&self, id: u64, error: &str) -> Result<u32, StoreError>;

    /// Account a final failed attempt and stamp `failed_at`. The record is
    /// excluded from all further fetches but stays visible for inspection.
    fn quarantine(&self, id: u64, error: &str) -> Result<(), StoreError>;

    /// Records that exhausted their retries, for operational inspection.
    fn quarantined(&self) -> Result<Vec<OutboxRecord>, StoreError>;

    /// Every record, in append order, regardless of state.
    fn peek_outbox(&self) -> Result<Vec<OutboxRecord>, StoreError>;
}
