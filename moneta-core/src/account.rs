use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{AccountId, CurrencyCode, MinorUnits, UserId};

/// How balance history is maintained for an account.
///
/// The kind decides which reconciliation strategy the mutation router picks,
/// so it is a closed enum: adding a provider with a new strategy is a
/// compile-checked change in every dispatch site.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    /// Transactions are entered by the user; each one shifts the balance by
    /// its signed amount.
    System,
    /// An external provider reports the authoritative end-of-day balance
    /// alongside synced transactions.
    BankSynced,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::System => "system",
            AccountKind::BankSynced => "bank_synced",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(AccountKind::System),
            "bank_synced" => Ok(AccountKind::BankSynced),
            other => Err(format!("unknown account kind: {other}")),
        }
    }
}

/// An account as the ledger engine needs to see it. Balance history never
/// lives here; it is derived from the snapshot series.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub currency_code: CurrencyCode,
    pub kind: AccountKind,
    /// Opening balance in the account's own currency.
    pub initial_balance: MinorUnits,
    /// Opening balance converted to the ledger base currency.
    pub ref_initial_balance: MinorUnits,
}
