use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use moneta_core::{AccountId, MinorUnits};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::{LedgerError, LedgerResult, SnapshotRow, SnapshotStore, SnapshotWrite};

const SNAPSHOT_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS balance_snapshots (
    account_id TEXT NOT NULL,
    date TEXT NOT NULL,
    amount INTEGER NOT NULL,
    PRIMARY KEY (account_id, date)
);
CREATE INDEX IF NOT EXISTS balance_snapshots_idx_account_date
    ON balance_snapshots(account_id, date);
"#;

/// SQLite-backed snapshot store used by the live runtime.
///
/// Write scopes run inside `BEGIN IMMEDIATE` transactions, so a crash
/// mid-algorithm rolls the whole mutation back and concurrent writers are
/// serialized by the database itself.
#[derive(Clone, Debug)]
pub struct SqliteSnapshotStore {
    path: PathBuf,
}

impl SqliteSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let store = Self { path: path.into() };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> LedgerResult<()> {
        let conn = self.connect()?;
        conn.execute_batch(SNAPSHOT_SCHEMA)?;
        Ok(())
    }

    fn connect(&self) -> LedgerResult<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn begin(&self, account: AccountId) -> LedgerResult<Box<dyn SnapshotWrite + '_>> {
        let conn = self.connect()?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Box::new(SqliteWrite {
            conn,
            account: account.to_string(),
            finished: false,
        }))
    }

    fn amount_at(&self, account: AccountId, date: NaiveDate) -> LedgerResult<Option<MinorUnits>> {
        let conn = self.connect()?;
        amount_at(&conn, &account.to_string(), date)
    }

    fn latest_on_or_before(
        &self,
        account: AccountId,
        date: NaiveDate,
    ) -> LedgerResult<Option<SnapshotRow>> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT account_id, date, amount FROM balance_snapshots
                 WHERE account_id = ?1 AND date <= ?2
                 ORDER BY date DESC LIMIT 1",
                params![account.to_string(), date.to_string()],
                row_to_snapshot,
            )
            .optional()?;
        row.transpose()
    }

    fn latest(&self, account: AccountId) -> LedgerResult<Option<SnapshotRow>> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT account_id, date, amount FROM balance_snapshots
                 WHERE account_id = ?1
                 ORDER BY date DESC LIMIT 1",
                params![account.to_string()],
                row_to_snapshot,
            )
            .optional()?;
        row.transpose()
    }

    fn rows_in_range(
        &self,
        accounts: &[AccountId],
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> LedgerResult<Vec<SnapshotRow>> {
        if accounts.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connect()?;
        let placeholders = vec!["?"; accounts.len()].join(", ");
        let sql = format!(
            "SELECT account_id, date, amount FROM balance_snapshots
             WHERE account_id IN ({placeholders})
               AND (?{from_idx} IS NULL OR date >= ?{from_idx})
               AND (?{to_idx} IS NULL OR date <= ?{to_idx})
             ORDER BY date ASC, account_id ASC",
            from_idx = accounts.len() + 1,
            to_idx = accounts.len() + 2,
        );
        let mut params: Vec<Value> = accounts
            .iter()
            .map(|id| Value::from(id.to_string()))
            .collect();
        params.push(optional_date(from));
        params.push(optional_date(to));

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(row_to_snapshot(row)??);
        }
        Ok(result)
    }

    fn has_rows(&self, account: AccountId) -> LedgerResult<bool> {
        let conn = self.connect()?;
        has_rows(&conn, &account.to_string())
    }
}

/// One open `BEGIN IMMEDIATE` transaction scoped to a single account.
struct SqliteWrite {
    conn: Connection,
    account: String,
    finished: bool,
}

impl SnapshotWrite for SqliteWrite {
    fn get(&mut self, date: NaiveDate) -> LedgerResult<Option<MinorUnits>> {
        amount_at(&self.conn, &self.account, date)
    }

    fn latest_before(&mut self, date: NaiveDate) -> LedgerResult<Option<SnapshotRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT account_id, date, amount FROM balance_snapshots
                 WHERE account_id = ?1 AND date < ?2
                 ORDER BY date DESC LIMIT 1",
                params![self.account, date.to_string()],
                row_to_snapshot,
            )
            .optional()?;
        row.transpose()
    }

    fn insert(&mut self, date: NaiveDate, amount: MinorUnits) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO balance_snapshots (account_id, date, amount) VALUES (?1, ?2, ?3)",
            params![self.account, date.to_string(), amount],
        )?;
        Ok(())
    }

    fn add(&mut self, date: NaiveDate, delta: MinorUnits) -> LedgerResult<()> {
        let changed = self.conn.execute(
            "UPDATE balance_snapshots SET amount = amount + ?1
             WHERE account_id = ?2 AND date = ?3",
            params![delta, self.account, date.to_string()],
        )?;
        if changed == 0 {
            return Err(LedgerError::InvalidState(format!(
                "no snapshot row at {date} for account {}",
                self.account
            )));
        }
        Ok(())
    }

    fn replace(&mut self, date: NaiveDate, amount: MinorUnits) -> LedgerResult<()> {
        self.conn.execute(
            "INSERT INTO balance_snapshots (account_id, date, amount) VALUES (?1, ?2, ?3)
             ON CONFLICT (account_id, date) DO UPDATE SET amount = excluded.amount",
            params![self.account, date.to_string(), amount],
        )?;
        Ok(())
    }

    fn shift_after(&mut self, date: NaiveDate, delta: MinorUnits) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE balance_snapshots SET amount = amount + ?1
             WHERE account_id = ?2 AND date > ?3",
            params![delta, self.account, date.to_string()],
        )?;
        Ok(())
    }

    fn shift_all(&mut self, delta: MinorUnits) -> LedgerResult<()> {
        self.conn.execute(
            "UPDATE balance_snapshots SET amount = amount + ?1 WHERE account_id = ?2",
            params![delta, self.account],
        )?;
        Ok(())
    }

    fn has_rows(&mut self) -> LedgerResult<bool> {
        has_rows(&self.conn, &self.account)
    }

    fn commit(mut self: Box<Self>) -> LedgerResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for SqliteWrite {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.conn.execute_batch("ROLLBACK");
        }
    }
}

fn amount_at(conn: &Connection, account: &str, date: NaiveDate) -> LedgerResult<Option<MinorUnits>> {
    let amount = conn
        .query_row(
            "SELECT amount FROM balance_snapshots WHERE account_id = ?1 AND date = ?2",
            params![account, date.to_string()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(amount)
}

fn has_rows(conn: &Connection, account: &str) -> LedgerResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM balance_snapshots WHERE account_id = ?1)",
        params![account],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(exists)
}

fn optional_date(value: Option<NaiveDate>) -> Value {
    value
        .map(|date| Value::from(date.to_string()))
        .unwrap_or(Value::Null)
}

fn row_to_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerResult<SnapshotRow>> {
    let account_str: String = row.get(0)?;
    let date_str: String = row.get(1)?;
    let amount: i64 = row.get(2)?;
    Ok(parse_snapshot(account_str, date_str, amount))
}

fn parse_snapshot(account_str: String, date_str: String, amount: i64) -> LedgerResult<SnapshotRow> {
    let account_id = account_str.parse::<AccountId>().map_err(|err| {
        LedgerError::Serialization(format!("invalid account id {account_str}: {err}"))
    })?;
    let date = date_str
        .parse::<NaiveDate>()
        .map_err(|err| LedgerError::Serialization(format!("invalid date {date_str}: {err}")))?;
    Ok(SnapshotRow {
        account_id,
        date,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn roundtrip_and_nearest_queries() {
        let dir = tempdir().unwrap();
        let store = SqliteSnapshotStore::new(dir.path().join("balances.db")).unwrap();
        let account = AccountId::random();

        let mut txn = store.begin(account).unwrap();
        txn.insert(date(2025, 3, 1), 100).unwrap();
        txn.insert(date(2025, 3, 10), 250).unwrap();
        txn.commit().unwrap();

        assert_eq!(store.amount_at(account, date(2025, 3, 10)).unwrap(), Some(250));
        assert_eq!(store.amount_at(account, date(2025, 3, 5)).unwrap(), None);

        let step = store
            .latest_on_or_before(account, date(2025, 3, 5))
            .unwrap()
            .unwrap();
        assert_eq!(step.date, date(2025, 3, 1));
        assert_eq!(step.amount, 100);

        let latest = store.latest(account).unwrap().unwrap();
        assert_eq!(latest.date, date(2025, 3, 10));
    }

    #[test]
    fn shift_after_is_a_single_bulk_update() {
        let dir = tempdir().unwrap();
        let store = SqliteSnapshotStore::new(dir.path().join("balances.db")).unwrap();
        let account = AccountId::random();

        let mut txn = store.begin(account).unwrap();
        txn.insert(date(2025, 1, 1), 10).unwrap();
        txn.insert(date(2025, 1, 15), 20).unwrap();
        txn.insert(date(2025, 2, 1), 30).unwrap();
        txn.shift_after(date(2025, 1, 1), 5).unwrap();
        txn.commit().unwrap();

        assert_eq!(store.amount_at(account, date(2025, 1, 1)).unwrap(), Some(10));
        assert_eq!(store.amount_at(account, date(2025, 1, 15)).unwrap(), Some(25));
        assert_eq!(store.amount_at(account, date(2025, 2, 1)).unwrap(), Some(35));
    }

    #[test]
    fn dropping_a_write_scope_rolls_back() {
        let dir = tempdir().unwrap();
        let store = SqliteSnapshotStore::new(dir.path().join("balances.db")).unwrap();
        let account = AccountId::random();

        {
            let mut txn = store.begin(account).unwrap();
            txn.insert(date(2025, 5, 1), 999).unwrap();
            // dropped without commit
        }
        assert!(!store.has_rows(account).unwrap());
    }

    #[test]
    fn rows_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("balances.db");
        let account = AccountId::random();
        {
            let store = SqliteSnapshotStore::new(&path).unwrap();
            let mut txn = store.begin(account).unwrap();
            txn.insert(date(2025, 7, 4), 4_200).unwrap();
            txn.commit().unwrap();
        }
        let reopened = SqliteSnapshotStore::new(&path).unwrap();
        assert_eq!(
            reopened.amount_at(account, date(2025, 7, 4)).unwrap(),
            Some(4_200)
        );
    }

    #[test]
    fn range_scan_filters_accounts_and_dates() {
        let dir = tempdir().unwrap();
        let store = SqliteSnapshotStore::new(dir.path().join("balances.db")).unwrap();
        let checking = AccountId::random();
        let savings = AccountId::random();

        let mut txn = store.begin(checking).unwrap();
        txn.insert(date(2025, 4, 1), 1).unwrap();
        txn.insert(date(2025, 4, 20), 2).unwrap();
        txn.commit().unwrap();
        let mut txn = store.begin(savings).unwrap();
        txn.insert(date(2025, 4, 10), 3).unwrap();
        txn.commit().unwrap();

        let rows = store
            .rows_in_range(&[checking, savings], Some(date(2025, 4, 5)), Some(date(2025, 4, 30)))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, date(2025, 4, 10));
        assert_eq!(rows[1].date, date(2025, 4, 20));

        let only_checking = store
            .rows_in_range(&[checking], None, None)
            .unwrap();
        assert_eq!(only_checking.len(), 2);
    }
}
