use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use moneta_core::{day_of, AccountId, MinorUnits};
use parking_lot::Mutex;
use tracing::debug;

use crate::{LedgerError, LedgerResult, SnapshotStore};

/// Overwrites a single day's snapshot with the authoritative balance an
/// external provider reported. No cascade: the provider's number already
/// accounts for fees, holds, and corrections that never show up as
/// discrete transactions, so re-deriving deltas from it would double
/// count.
///
/// Correctness of "last write for a day wins" requires callers to present
/// transactions in non-decreasing time order. That contract is enforced:
/// a per-account watermark of the last reconciled instant rejects
/// regressions with [`LedgerError::OutOfOrderSync`].
pub struct AbsoluteEngine {
    store: Arc<dyn SnapshotStore>,
    watermarks: Mutex<HashMap<AccountId, DateTime<Utc>>>,
}

impl AbsoluteEngine {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store,
            watermarks: Mutex::new(HashMap::new()),
        }
    }

    /// Set the end-of-day balance for the day containing `at`.
    /// `ref_balance` must already be in base currency.
    pub fn reconcile(
        &self,
        account: AccountId,
        at: DateTime<Utc>,
        ref_balance: MinorUnits,
    ) -> LedgerResult<()> {
        if let Some(&watermark) = self.watermarks.lock().get(&account) {
            if at < watermark {
                return Err(LedgerError::OutOfOrderSync {
                    account,
                    at,
                    watermark,
                });
            }
        }

        let date = day_of(at);
        debug!(account = %account, %date, ref_balance, "reconciling absolute balance");
        let mut txn = self.store.begin(account)?;
        txn.replace(date, ref_balance)?;
        txn.commit()?;

        // Only a committed write moves the watermark. A failed write must
        // not block retries or intermediate syncs that never landed.
        let mut watermarks = self.watermarks.lock();
        let entry = watermarks.entry(account).or_insert(at);
        if at > *entry {
            *entry = at;
        }
        Ok(())
    }
}
