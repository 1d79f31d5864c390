use std::sync::Arc;

use moneta_core::{
    to_base_minor, Account, AccountId, AccountKind, MinorUnits, TransactionRecord,
};
use tracing::{debug, warn};

use crate::{
    AbsoluteEngine, AccountDirectory, IncrementalEngine, LedgerError, LedgerResult, RateResolver,
    SnapshotStore,
};

/// Entry point for transaction mutations. The persistence layer calls one
/// hook per durable create/update/delete; the router inspects the owning
/// account's kind and dispatches to the matching engine. It never writes
/// snapshots itself.
///
/// The match on [`AccountKind`] is exhaustive, so a new reconciliation
/// strategy is a compile-checked change here rather than a silent
/// default-case fallthrough.
pub struct MutationRouter {
    incremental: IncrementalEngine,
    absolute: AbsoluteEngine,
    accounts: Arc<dyn AccountDirectory>,
    rates: Arc<dyn RateResolver>,
}

impl MutationRouter {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        accounts: Arc<dyn AccountDirectory>,
        rates: Arc<dyn RateResolver>,
    ) -> Self {
        Self {
            incremental: IncrementalEngine::new(store.clone()),
            absolute: AbsoluteEngine::new(store),
            accounts,
            rates,
        }
    }

    pub fn on_transaction_created(&self, tx: &TransactionRecord) -> LedgerResult<()> {
        match tx.account_kind {
            AccountKind::System => self.apply(tx.account_id, tx.ledger_date(), tx.signed_ref_amount()),
            AccountKind::BankSynced => self.reconcile_synced(tx),
        }
    }

    pub fn on_transaction_updated(
        &self,
        new: &TransactionRecord,
        prev: &TransactionRecord,
    ) -> LedgerResult<()> {
        match new.account_kind {
            AccountKind::System => {
                let unchanged_slot = new.account_id == prev.account_id
                    && new.ledger_date() == prev.ledger_date()
                    && new.kind == prev.kind;
                if unchanged_slot {
                    let delta = new.signed_ref_amount() - prev.signed_ref_amount();
                    if delta == 0 {
                        return Ok(());
                    }
                    self.apply(new.account_id, new.ledger_date(), delta)
                } else {
                    // The transaction moved: undo it where it was, replay it
                    // where it now lives.
                    self.apply(
                        prev.account_id,
                        prev.ledger_date(),
                        -prev.signed_ref_amount(),
                    )?;
                    self.apply(new.account_id, new.ledger_date(), new.signed_ref_amount())
                }
            }
            AccountKind::BankSynced => self.reconcile_synced(new),
        }
    }

    pub fn on_transaction_deleted(&self, tx: &TransactionRecord) -> LedgerResult<()> {
        match tx.account_kind {
            AccountKind::System => {
                self.apply(tx.account_id, tx.ledger_date(), -tx.signed_ref_amount())
            }
            AccountKind::BankSynced => {
                // The provider's balance stays authoritative; the next sync
                // corrects the day if needed.
                debug!(account = %tx.account_id, tx = %tx.id, "skipping ledger update for synced deletion");
                Ok(())
            }
        }
    }

    fn apply(
        &self,
        account_id: AccountId,
        date: chrono::NaiveDate,
        delta: MinorUnits,
    ) -> LedgerResult<()> {
        let account = self.lookup(account_id)?;
        self.incremental.apply_delta(&account, date, delta)
    }

    /// Convert the provider-reported balance into base currency and
    /// overwrite the day. A missing provider balance or an unresolvable
    /// rate skips the write: the day stays stale until the next sync.
    fn reconcile_synced(&self, tx: &TransactionRecord) -> LedgerResult<()> {
        let Some(balance) = tx.external_balance() else {
            debug!(account = %tx.account_id, tx = %tx.id, "synced transaction carries no balance");
            return Ok(());
        };
        let date = tx.ledger_date();
        let rate = match self
            .rates
            .rate(tx.user_id, date, &tx.currency_code, &tx.ref_currency_code)
        {
            Ok(rate) => rate,
            Err(err) => {
                warn!(
                    account = %tx.account_id,
                    %date,
                    error = %err,
                    "skipping absolute reconciliation: rate unavailable"
                );
                return Ok(());
            }
        };
        let ref_balance = to_base_minor(balance, rate).ok_or_else(|| {
            LedgerError::InvalidState(format!(
                "balance {balance} at rate {rate} overflows minor units"
            ))
        })?;
        self.absolute.reconcile(tx.account_id, tx.time, ref_balance)
    }

    fn lookup(&self, id: AccountId) -> LedgerResult<Account> {
        self.accounts
            .account(id)?
            .ok_or_else(|| LedgerError::InvalidState(format!("unknown account {id}")))
    }
}
