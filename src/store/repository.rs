use serde::de::DeserializeOwned;

use crate::aggregate::Aggregate;
use crate::error::StoreError;

/// Write-side store contract.
///
/// `commit` is the transaction boundary: every row snapshot and every
/// captured event either persists together or not at all. Capture buffers
/// are cleared only after a successful commit.
///
/// # Examples
///
/// ```ignore
/// // Single aggregate
/// store.commit(&mut order)?;
///
/// // Several aggregates in one atomic unit
/// store.commit_all(&mut [&mut order, &mut inventory])?;
/// ```
pub trait Repository {
    /// Load an aggregate from its stored row.
    fn get<A>(&self, id: &str) -> Result<Option<A>, StoreError>
    where
        A: Aggregate + DeserializeOwned;

    /// Commit one aggregate and its captured events atomically.
    fn commit<A: Aggregate>(&self, aggregate: &mut A) -> Result<(), StoreError>;

    /// Commit several aggregates and all their captured events atomically.
    fn commit_all(&self, aggregates: &mut [&mut dyn Aggregate]) -> Result<(), StoreError>;
}
