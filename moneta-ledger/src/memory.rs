use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use moneta_core::{AccountId, MinorUnits};
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};

use crate::{LedgerError, LedgerResult, SnapshotRow, SnapshotStore, SnapshotWrite};

type Series = BTreeMap<NaiveDate, MinorUnits>;

/// In-memory snapshot store: one ordered map per account, which is the
/// step-function series made literal. Useful for tests and as the cache
/// tier of embedders that persist elsewhere.
///
/// Write scopes hold the account's mutex for their whole lifetime, stage
/// changes on a copy, and swap it in on commit, so concurrent writers to
/// one account are serialized while other accounts proceed untouched.
#[derive(Default)]
pub struct MemorySnapshotStore {
    accounts: Mutex<HashMap<AccountId, Arc<Mutex<Series>>>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn series(&self, account: AccountId) -> Arc<Mutex<Series>> {
        self.accounts
            .lock()
            .entry(account)
            .or_insert_with(|| Arc::new(Mutex::new(Series::new())))
            .clone()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn begin(&self, account: AccountId) -> LedgerResult<Box<dyn SnapshotWrite + '_>> {
        let slot = self.series(account);
        let guard = slot.lock_arc();
        let staged = guard.clone();
        Ok(Box::new(MemoryWrite {
            guard,
            staged,
            account,
        }))
    }

    fn amount_at(&self, account: AccountId, date: NaiveDate) -> LedgerResult<Option<MinorUnits>> {
        Ok(self.series(account).lock().get(&date).copied())
    }

    fn latest_on_or_before(
        &self,
        account: AccountId,
        date: NaiveDate,
    ) -> LedgerResult<Option<SnapshotRow>> {
        let slot = self.series(account);
        let series = slot.lock();
        Ok(series
            .range(..=date)
            .next_back()
            .map(|(day, amount)| snapshot(account, *day, *amount)))
    }

    fn latest(&self, account: AccountId) -> LedgerResult<Option<SnapshotRow>> {
        let slot = self.series(account);
        let series = slot.lock();
        Ok(series
            .iter()
            .next_back()
            .map(|(day, amount)| snapshot(account, *day, *amount)))
    }

    fn rows_in_range(
        &self,
        accounts: &[AccountId],
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> LedgerResult<Vec<SnapshotRow>> {
        let mut rows = Vec::new();
        for &account in accounts {
            let slot = self.series(account);
            let series = slot.lock();
            for (&day, &amount) in series.iter() {
                if from.is_some_and(|start| day < start) || to.is_some_and(|end| day > end) {
                    continue;
                }
                rows.push(snapshot(account, day, amount));
            }
        }
        rows.sort_by(|a, b| (a.date, a.account_id).cmp(&(b.date, b.account_id)));
        Ok(rows)
    }

    fn has_rows(&self, account: AccountId) -> LedgerResult<bool> {
        Ok(!self.series(account).lock().is_empty())
    }
}

struct MemoryWrite {
    guard: ArcMutexGuard<RawMutex, Series>,
    staged: Series,
    account: AccountId,
}

impl SnapshotWrite for MemoryWrite {
    fn get(&mut self, date: NaiveDate) -> LedgerResult<Option<MinorUnits>> {
        Ok(self.staged.get(&date).copied())
    }

    fn latest_before(&mut self, date: NaiveDate) -> LedgerResult<Option<SnapshotRow>> {
        Ok(self
            .staged
            .range(..date)
            .next_back()
            .map(|(day, amount)| snapshot(self.account, *day, *amount)))
    }

    fn insert(&mut self, date: NaiveDate, amount: MinorUnits) -> LedgerResult<()> {
        self.staged.insert(date, amount);
        Ok(())
    }

    fn add(&mut self, date: NaiveDate, delta: MinorUnits) -> LedgerResult<()> {
        match self.staged.get_mut(&date) {
            Some(amount) => {
                *amount += delta;
                Ok(())
            }
            None => Err(LedgerError::InvalidState(format!(
                "no snapshot row at {date} for account {}",
                self.account
            ))),
        }
    }

    fn replace(&mut self, date: NaiveDate, amount: MinorUnits) -> LedgerResult<()> {
        self.staged.insert(date, amount);
        Ok(())
    }

    fn shift_after(&mut self, date: NaiveDate, delta: MinorUnits) -> LedgerResult<()> {
        for (_, amount) in self.staged.iter_mut().filter(|(day, _)| **day > date) {
            *amount += delta;
        }
        Ok(())
    }

    fn shift_all(&mut self, delta: MinorUnits) -> LedgerResult<()> {
        for amount in self.staged.values_mut() {
            *amount += delta;
        }
        Ok(())
    }

    fn has_rows(&mut self) -> LedgerResult<bool> {
        Ok(!self.staged.is_empty())
    }

    fn commit(mut self: Box<Self>) -> LedgerResult<()> {
        *self.guard = std::mem::take(&mut self.staged);
        Ok(())
    }
}

fn snapshot(account_id: AccountId, date: NaiveDate, amount: MinorUnits) -> SnapshotRow {
    SnapshotRow {
        account_id,
        date,
        amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn step_function_resolution() {
        let store = MemorySnapshotStore::new();
        let account = AccountId::random();
        let mut txn = store.begin(account).unwrap();
        txn.insert(date(1), 100).unwrap();
        txn.insert(date(10), 300).unwrap();
        txn.commit().unwrap();

        let step = store.latest_on_or_before(account, date(9)).unwrap().unwrap();
        assert_eq!((step.date, step.amount), (date(1), 100));
        assert!(store
            .latest_on_or_before(account, NaiveDate::from_ymd_opt(2025, 5, 31).unwrap())
            .unwrap()
            .is_none());
    }

    #[test]
    fn uncommitted_scope_leaves_no_trace() {
        let store = MemorySnapshotStore::new();
        let account = AccountId::random();
        {
            let mut txn = store.begin(account).unwrap();
            txn.insert(date(1), 100).unwrap();
        }
        assert!(!store.has_rows(account).unwrap());
    }

    #[test]
    fn staged_reads_observe_staged_writes() {
        let store = MemorySnapshotStore::new();
        let account = AccountId::random();
        let mut txn = store.begin(account).unwrap();
        txn.insert(date(1), 100).unwrap();
        assert_eq!(txn.get(date(1)).unwrap(), Some(100));
        assert!(txn.has_rows().unwrap());
        let prior = txn.latest_before(date(5)).unwrap().unwrap();
        assert_eq!(prior.amount, 100);
    }
}
