//! Domain types shared between the Moneta ledger engine and its embedders.

mod account;
mod calendar;
mod currency;
mod ids;
mod money;
mod transaction;

pub use account::{Account, AccountKind};
pub use calendar::{day_of, first_of_month, previous_day};
pub use currency::CurrencyCode;
pub use ids::{AccountId, TransactionId, UserId};
pub use money::{to_base_minor, MinorUnits};
pub use transaction::{ExternalSyncData, TransactionKind, TransactionRecord};
