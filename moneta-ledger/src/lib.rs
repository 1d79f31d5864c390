//! Balance snapshot engine: derives a per-account time series of
//! end-of-day balances from a mutable stream of transactions.
//!
//! Locally-entered (system) accounts accumulate signed deltas with a
//! forward cascade; bank-synced accounts take the provider's absolute
//! end-of-day balance as ground truth. The [`MutationRouter`] picks the
//! strategy per mutation; [`BalanceReader`] resolves the sparse series
//! for reporting.

mod absolute;
mod directory;
mod error;
mod incremental;
mod lifecycle;
mod memory;
mod query;
mod rates;
mod router;
mod sqlite;
mod store;

pub use absolute::AbsoluteEngine;
pub use directory::{AccountDirectory, MemoryAccountDirectory};
pub use error::{LedgerError, LedgerResult};
pub use incremental::IncrementalEngine;
pub use lifecycle::AccountLifecycle;
pub use memory::MemorySnapshotStore;
pub use query::{BalanceReader, HistoryQuery};
pub use rates::{FixedRateResolver, RateError, RateResolver};
pub use router::MutationRouter;
pub use sqlite::SqliteSnapshotStore;
pub use store::{SnapshotRow, SnapshotStore, SnapshotWrite};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use moneta_core::{
        Account, AccountId, AccountKind, CurrencyCode, TransactionId, TransactionKind,
        TransactionRecord, UserId,
    };
    use std::sync::Arc;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn income(account: &Account, ref_amount: i64, day: u32) -> TransactionRecord {
        record(account, TransactionKind::Income, ref_amount, day)
    }

    fn expense(account: &Account, ref_amount: i64, day: u32) -> TransactionRecord {
        record(account, TransactionKind::Expense, ref_amount, day)
    }

    fn record(
        account: &Account,
        kind: TransactionKind,
        ref_amount: i64,
        day: u32,
    ) -> TransactionRecord {
        TransactionRecord {
            id: TransactionId::random(),
            user_id: account.user_id,
            account_id: account.id,
            account_kind: account.kind,
            kind,
            ref_amount,
            time: Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap(),
            currency_code: account.currency_code.clone(),
            ref_currency_code: account.currency_code.clone(),
            external: None,
        }
    }

    /// Lifecycle of a freshly opened wallet: create, spend, edit, undo.
    #[test]
    fn wallet_lifecycle_keeps_the_series_consistent() {
        let store: Arc<MemorySnapshotStore> = Arc::new(MemorySnapshotStore::new());
        let directory = Arc::new(MemoryAccountDirectory::new());
        let router = MutationRouter::new(
            store.clone(),
            directory.clone(),
            Arc::new(FixedRateResolver::new()),
        );
        let reader = BalanceReader::new(store.clone());

        let wallet = Account {
            id: AccountId::random(),
            user_id: UserId::random(),
            currency_code: CurrencyCode::from("EUR"),
            kind: AccountKind::System,
            initial_balance: 0,
            ref_initial_balance: 0,
        };
        directory.upsert(wallet.clone());

        // Income of 700 on day 1.
        let salary = income(&wallet, 700, 1);
        router.on_transaction_created(&salary).unwrap();
        assert_eq!(store.amount_at(wallet.id, date(1)).unwrap(), Some(700));

        // Expense of 200 on day 3.
        let groceries = expense(&wallet, 200, 3);
        router.on_transaction_created(&groceries).unwrap();
        assert_eq!(store.amount_at(wallet.id, date(3)).unwrap(), Some(500));

        // The salary was actually 900: the +200 delta cascades to day 3.
        let mut corrected = salary.clone();
        corrected.ref_amount = 900;
        router.on_transaction_updated(&corrected, &salary).unwrap();
        assert_eq!(store.amount_at(wallet.id, date(1)).unwrap(), Some(900));
        assert_eq!(store.amount_at(wallet.id, date(3)).unwrap(), Some(700));

        // The groceries are refunded and deleted: day 3 returns to 900.
        router.on_transaction_deleted(&groceries).unwrap();
        assert_eq!(store.amount_at(wallet.id, date(1)).unwrap(), Some(900));
        assert_eq!(store.amount_at(wallet.id, date(3)).unwrap(), Some(900));

        // Reporting sees the same story through the step function.
        assert_eq!(reader.balance_as_of(wallet.id, date(2)).unwrap(), Some(900));
        assert_eq!(reader.current_balance(wallet.id).unwrap(), Some(900));
    }

    /// The same flow against the sqlite backend, to catch SQL-level
    /// deviations from the in-memory semantics.
    #[test]
    fn wallet_lifecycle_on_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<SqliteSnapshotStore> =
            Arc::new(SqliteSnapshotStore::new(dir.path().join("balances.db")).unwrap());
        let directory = Arc::new(MemoryAccountDirectory::new());
        let router = MutationRouter::new(
            store.clone(),
            directory.clone(),
            Arc::new(FixedRateResolver::new()),
        );

        let wallet = Account {
            id: AccountId::random(),
            user_id: UserId::random(),
            currency_code: CurrencyCode::from("EUR"),
            kind: AccountKind::System,
            initial_balance: 0,
            ref_initial_balance: 0,
        };
        directory.upsert(wallet.clone());

        let salary = income(&wallet, 700, 1);
        router.on_transaction_created(&salary).unwrap();
        let groceries = expense(&wallet, 200, 3);
        router.on_transaction_created(&groceries).unwrap();
        let mut corrected = salary.clone();
        corrected.ref_amount = 900;
        router.on_transaction_updated(&corrected, &salary).unwrap();
        router.on_transaction_deleted(&groceries).unwrap();

        assert_eq!(store.amount_at(wallet.id, date(1)).unwrap(), Some(900));
        assert_eq!(store.amount_at(wallet.id, date(3)).unwrap(), Some(900));
    }
}
