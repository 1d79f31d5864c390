use chrono::NaiveDate;
use moneta_core::{AccountId, MinorUnits};
use serde::{Deserialize, Serialize};

use crate::LedgerResult;

/// One persisted point of an account's balance series: the end-of-day
/// balance in base currency. Days without a row take the value of the
/// nearest earlier row (step function).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub amount: MinorUnits,
}

/// Abstraction over durable snapshot storage engines.
///
/// Reads may run concurrently; every mutation goes through [`begin`], which
/// returns a write scope that is serialized against other writers of the
/// same account and applies atomically on [`SnapshotWrite::commit`].
///
/// [`begin`]: SnapshotStore::begin
pub trait SnapshotStore: Send + Sync {
    /// Open an atomic write scope for one account's series.
    fn begin(&self, account: AccountId) -> LedgerResult<Box<dyn SnapshotWrite + '_>>;

    /// Exact-date point lookup.
    fn amount_at(&self, account: AccountId, date: NaiveDate) -> LedgerResult<Option<MinorUnits>>;

    /// Nearest row at or before `date`, resolving the step function.
    fn latest_on_or_before(
        &self,
        account: AccountId,
        date: NaiveDate,
    ) -> LedgerResult<Option<SnapshotRow>>;

    /// The account's most recent row, regardless of date.
    fn latest(&self, account: AccountId) -> LedgerResult<Option<SnapshotRow>>;

    /// Rows for the given accounts inside the (inclusive) date range,
    /// ordered by date then account.
    fn rows_in_range(
        &self,
        accounts: &[AccountId],
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> LedgerResult<Vec<SnapshotRow>>;

    /// Whether the account has any snapshot row at all.
    fn has_rows(&self, account: AccountId) -> LedgerResult<bool>;
}

/// Mutations applied to one account's series inside a single atomic scope.
///
/// Dropping the scope without calling [`commit`](SnapshotWrite::commit)
/// discards every staged change.
pub trait SnapshotWrite {
    /// Exact-date point lookup, observing staged writes.
    fn get(&mut self, date: NaiveDate) -> LedgerResult<Option<MinorUnits>>;

    /// Nearest row strictly before `date`.
    fn latest_before(&mut self, date: NaiveDate) -> LedgerResult<Option<SnapshotRow>>;

    /// Insert a row for a date that has none.
    fn insert(&mut self, date: NaiveDate, amount: MinorUnits) -> LedgerResult<()>;

    /// Add a delta to an existing row.
    fn add(&mut self, date: NaiveDate, delta: MinorUnits) -> LedgerResult<()>;

    /// Upsert: set the row's amount, creating it if missing.
    fn replace(&mut self, date: NaiveDate, amount: MinorUnits) -> LedgerResult<()>;

    /// Bulk-add a delta to every row strictly after `date`.
    fn shift_after(&mut self, date: NaiveDate, delta: MinorUnits) -> LedgerResult<()>;

    /// Bulk-add a delta to every row of the account.
    fn shift_all(&mut self, delta: MinorUnits) -> LedgerResult<()>;

    /// Whether the account has any row, observing staged writes.
    fn has_rows(&mut self) -> LedgerResult<bool>;

    /// Atomically apply every staged change.
    fn commit(self: Box<Self>) -> LedgerResult<()>;
}
