use std::sync::Arc;

use chrono::Utc;
use moneta_core::{day_of, Account, MinorUnits};
use tracing::debug;

use crate::{LedgerResult, SnapshotStore};

/// Reacts to account creation and opening-balance edits.
///
/// Creation seeds the series with a single row at today; editing the
/// opening balance shifts every existing row by the difference, because
/// the opening balance is a term of every snapshot regardless of date.
pub struct AccountLifecycle {
    store: Arc<dyn SnapshotStore>,
}

impl AccountLifecycle {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    pub fn on_account_created(&self, account: &Account) -> LedgerResult<()> {
        let mut txn = self.store.begin(account.id)?;
        if txn.has_rows()? {
            return Ok(());
        }
        let today = day_of(Utc::now());
        debug!(account = %account.id, %today, amount = account.ref_initial_balance, "seeding balance series");
        txn.insert(today, account.ref_initial_balance)?;
        txn.commit()
    }

    pub fn on_initial_balance_edited(
        &self,
        account: &Account,
        prev_ref_initial_balance: MinorUnits,
    ) -> LedgerResult<()> {
        let diff = account.ref_initial_balance - prev_ref_initial_balance;
        if diff == 0 {
            return Ok(());
        }
        let mut txn = self.store.begin(account.id)?;
        if txn.has_rows()? {
            debug!(account = %account.id, diff, "shifting balance series for opening-balance edit");
            txn.shift_all(diff)?;
        } else {
            // Account edited before any snapshot existed: behave like creation.
            txn.insert(day_of(Utc::now()), account.ref_initial_balance)?;
        }
        txn.commit()
    }
}
