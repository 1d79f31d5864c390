use std::sync::Arc;

use chrono::NaiveDate;
use moneta_core::{first_of_month, previous_day, Account, MinorUnits};
use tracing::debug;

use crate::{LedgerError, LedgerResult, SnapshotStore};

/// Applies signed balance deltas for system accounts, keeping the whole
/// snapshot series consistent.
///
/// Every call runs anchor, target, and cascade steps in that order inside
/// one atomic write scope:
///
/// 1. make sure the first day of the mutation's month has a row, seeded
///    from the nearest earlier row, so period queries never scan past a
///    month boundary;
/// 2. fold the delta into the row at the mutation date, creating it from
///    the nearest earlier row; for an account with no rows at all this
///    creates the `(date - 1, ref_initial_balance)` baseline pair instead;
/// 3. shift every later row by the delta in one bulk update.
pub struct IncrementalEngine {
    store: Arc<dyn SnapshotStore>,
}

impl IncrementalEngine {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    pub fn apply_delta(
        &self,
        account: &Account,
        date: NaiveDate,
        delta: MinorUnits,
    ) -> LedgerResult<()> {
        debug!(account = %account.id, %date, delta, "applying incremental balance delta");
        let mut txn = self.store.begin(account.id)?;

        // Anchor: the month's first day carries the balance from before it,
        // so it must be written before the delta lands anywhere.
        let month_start = first_of_month(date);
        if txn.get(month_start)?.is_none() {
            if let Some(prior) = txn.latest_before(month_start)? {
                txn.insert(month_start, prior.amount)?;
            }
        }

        // Target: fold the delta into the mutation date itself.
        match txn.get(date)? {
            Some(_) => txn.add(date, delta)?,
            None => match txn.latest_before(date)? {
                Some(prior) => txn.insert(date, prior.amount + delta)?,
                None => {
                    // Earliest-known activity for this account: materialize
                    // the pre-transaction baseline one day earlier, then the
                    // transaction's own row.
                    let baseline_date = previous_day(date).ok_or_else(|| {
                        LedgerError::InvalidState(format!("no representable day before {date}"))
                    })?;
                    txn.insert(baseline_date, account.ref_initial_balance)?;
                    txn.insert(date, account.ref_initial_balance + delta)?;
                }
            },
        }

        // Cascade: every later row moves by the same delta.
        txn.shift_after(date, delta)?;
        txn.commit()
    }
}
