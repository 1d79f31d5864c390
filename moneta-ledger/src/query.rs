use std::sync::Arc;

use chrono::NaiveDate;
use moneta_core::{AccountId, MinorUnits};

use crate::{LedgerResult, SnapshotRow, SnapshotStore};

/// Filter describing which slice of balance history to load.
#[derive(Clone, Debug, Default)]
pub struct HistoryQuery {
    pub accounts: Vec<AccountId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl HistoryQuery {
    pub fn for_accounts(accounts: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            accounts: accounts.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn since(mut self, from: NaiveDate) -> Self {
        self.from = Some(from);
        self
    }

    pub fn until(mut self, to: NaiveDate) -> Self {
        self.to = Some(to);
        self
    }
}

/// Read side of the ledger: resolves the sparse snapshot series into the
/// balances reporting needs. The balance for a day without a row is the
/// value of the nearest earlier row.
pub struct BalanceReader {
    store: Arc<dyn SnapshotStore>,
}

impl BalanceReader {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// The account's balance as of end of `date`, if it has any history
    /// by then.
    pub fn balance_as_of(
        &self,
        account: AccountId,
        date: NaiveDate,
    ) -> LedgerResult<Option<MinorUnits>> {
        Ok(self
            .store
            .latest_on_or_before(account, date)?
            .map(|row| row.amount))
    }

    /// The account's most recent balance. This is the derived projection
    /// behind any "current balance" display; it is never stored separately.
    pub fn current_balance(&self, account: AccountId) -> LedgerResult<Option<MinorUnits>> {
        Ok(self.store.latest(account)?.map(|row| row.amount))
    }

    /// Sum of the given accounts' balances as of end of `date`. Accounts
    /// with no history by then contribute zero.
    pub fn total_as_of(
        &self,
        accounts: &[AccountId],
        date: NaiveDate,
    ) -> LedgerResult<MinorUnits> {
        let mut total = 0;
        for &account in accounts {
            total += self.balance_as_of(account, date)?.unwrap_or(0);
        }
        Ok(total)
    }

    /// Balance history for a set of accounts, ordered by date. An account
    /// whose first in-range row comes after `from` (or that has no in-range
    /// row at all) contributes a carried-in boundary row at `from`, so
    /// every returned account with prior history has a value at the start
    /// of the range.
    pub fn history(&self, query: HistoryQuery) -> LedgerResult<Vec<SnapshotRow>> {
        let mut rows = self
            .store
            .rows_in_range(&query.accounts, query.from, query.to)?;
        if let Some(from) = query.from {
            for &account in &query.accounts {
                let earliest = rows
                    .iter()
                    .filter(|row| row.account_id == account)
                    .map(|row| row.date)
                    .min();
                if earliest == Some(from) {
                    continue;
                }
                if let Some(carry) = self.store.latest_on_or_before(account, from)? {
                    rows.push(SnapshotRow {
                        account_id: account,
                        date: from,
                        amount: carry.amount,
                    });
                }
            }
            rows.sort_by(|a, b| (a.date, a.account_id).cmp(&(b.date, b.account_id)));
        }
        Ok(rows)
    }
}
