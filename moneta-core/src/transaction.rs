use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{day_of, AccountId, AccountKind, CurrencyCode, MinorUnits, TransactionId, UserId};

/// Direction of a transaction relative to the account.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

/// Provider-supplied fields attached to bank-synced transactions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExternalSyncData {
    /// Account balance after this transaction, in the account's own
    /// currency. Not every provider reports it.
    pub balance: Option<MinorUnits>,
    /// Raw provider payload, kept opaque for the engine.
    pub payload: Option<serde_json::Value>,
}

/// The slice of a transaction row the ledger engine reacts to.
///
/// The persistence layer hands this over after every durable write, with
/// `account_kind` mirroring the owning account's kind at the time of the
/// write.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub user_id: UserId,
    pub account_id: AccountId,
    pub account_kind: AccountKind,
    pub kind: TransactionKind,
    /// Unsigned magnitude in the ledger base currency.
    pub ref_amount: MinorUnits,
    pub time: DateTime<Utc>,
    pub currency_code: CurrencyCode,
    pub ref_currency_code: CurrencyCode,
    pub external: Option<ExternalSyncData>,
}

impl TransactionRecord {
    /// The balance effect of this transaction: positive for income,
    /// negative for expense.
    pub fn signed_ref_amount(&self) -> MinorUnits {
        match self.kind {
            TransactionKind::Income => self.ref_amount,
            TransactionKind::Expense => -self.ref_amount,
        }
    }

    /// The calendar day this transaction belongs to in the ledger.
    pub fn ledger_date(&self) -> NaiveDate {
        day_of(self.time)
    }

    /// Provider-reported balance after this transaction, if any.
    pub fn external_balance(&self) -> Option<MinorUnits> {
        self.external.as_ref().and_then(|data| data.balance)
    }
}
