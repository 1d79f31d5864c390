use std::collections::HashMap;

use moneta_core::{Account, AccountId};
use parking_lot::RwLock;

use crate::LedgerResult;

/// Lookup seam to the account-persistence layer. The router only needs the
/// owning account's profile (opening balance, currency) when a mutation
/// forces a series bootstrap.
pub trait AccountDirectory: Send + Sync {
    fn account(&self, id: AccountId) -> LedgerResult<Option<Account>>;
}

/// Process-local directory backed by a map. Embedders that keep accounts
/// in a database register them here after loading; tests use it directly.
#[derive(Default)]
pub struct MemoryAccountDirectory {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, account: Account) {
        self.accounts.write().insert(account.id, account);
    }

    pub fn remove(&self, id: AccountId) {
        self.accounts.write().remove(&id);
    }
}

impl AccountDirectory for MemoryAccountDirectory {
    fn account(&self, id: AccountId) -> LedgerResult<Option<Account>> {
        Ok(self.accounts.read().get(&id).cloned())
    }
}
