use std::str::FromStr;

use chrono::DateTime;
use rusqlite::{Connection, ErrorCode, Row, params};
use rust_decimal::Decimal;

use crate::domain::date_range::DateRange;
use crate::domain::message::MessageId;
use crate::domain::transaction::{NewTransaction, TransactionRecord};
use crate::error::StoreError;
use crate::store::repo::TransactionStore;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS transactions (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                transaction_id    TEXT NOT NULL UNIQUE,
                transaction_type  TEXT NOT NULL,
                sender_name       TEXT NOT NULL,
                receiver_name     TEXT NOT NULL,
                amount            TEXT NOT NULL,
                fee               TEXT NOT NULL DEFAULT '0',
                total             TEXT NOT NULL,
                occurred_at       TEXT NOT NULL,
                occurred_on       TEXT NOT NULL,
                owner             TEXT NOT NULL,
                source_message    INTEGER
            );

            CREATE INDEX IF NOT EXISTS transactions_owner_day
                ON transactions (owner, occurred_on);
            "#,
        )?;
        Ok(())
    }

    /// Number of stored transactions, all owners.
    pub fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))?;
        Ok(n as usize)
    }
}

impl TransactionStore for SqliteStore {
    fn exists(&self, transaction_id: &str) -> Result<bool, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached(r#"SELECT 1 FROM transactions WHERE transaction_id=?1 LIMIT 1"#)?;
        Ok(stmt.exists(params![transaction_id])?)
    }

    fn insert(
        &self,
        owner: &str,
        source_message: Option<MessageId>,
        tx: &NewTransaction,
    ) -> Result<TransactionRecord, StoreError> {
        let res = self.conn.execute(
            r#"
            INSERT INTO transactions (
                transaction_id, transaction_type, sender_name, receiver_name,
                amount, fee, total, occurred_at, occurred_on, owner, source_message
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                tx.transaction_id,
                tx.transaction_type,
                tx.sender_name,
                tx.receiver_name,
                tx.amount.to_string(),
                tx.fee.to_string(),
                tx.total.to_string(),
                tx.occurred_at.to_rfc3339(),
                tx.occurred_at.date_naive().format("%Y-%m-%d").to_string(),
                owner,
                source_message,
            ],
        );

        match res {
            Ok(_) => Ok(TransactionRecord {
                id: self.conn.last_insert_rowid(),
                owner: owner.to_string(),
                source_message,
                transaction: tx.clone(),
            }),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::Conflict(tx.transaction_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, owner: &str, range: &DateRange) -> Result<Vec<TransactionRecord>, StoreError> {
        let from = range.from.map(|d| d.format("%Y-%m-%d").to_string());
        let to = range.to.map(|d| d.format("%Y-%m-%d").to_string());

        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, owner, source_message, transaction_id, transaction_type,
                   sender_name, receiver_name, amount, fee, total, occurred_at
            FROM transactions
            WHERE owner=?1
              AND (?2 IS NULL OR occurred_on >= ?2)
              AND (?3 IS NULL OR occurred_on <= ?3)
            ORDER BY occurred_at DESC, id DESC
            "#,
        )?;

        let mut rows = stmt.query(params![owner, from, to])?;
        let mut out = Vec::new();
        while let Some(r) = rows.next()? {
            out.push(record_from_row(r)?);
        }
        Ok(out)
    }
}

fn record_from_row(r: &Row) -> Result<TransactionRecord, StoreError> {
    let occurred_at: String = r.get(10)?;
    Ok(TransactionRecord {
        id: r.get(0)?,
        owner: r.get(1)?,
        source_message: r.get(2)?,
        transaction: NewTransaction {
            transaction_id: r.get(3)?,
            transaction_type: r.get(4)?,
            sender_name: r.get(5)?,
            receiver_name: r.get(6)?,
            amount: decimal(&r.get::<_, String>(7)?)?,
            fee: decimal(&r.get::<_, String>(8)?)?,
            total: decimal(&r.get::<_, String>(9)?)?,
            occurred_at: DateTime::parse_from_rfc3339(&occurred_at)
                .map_err(|e| StoreError::Corrupt(format!("occurred_at '{occurred_at}': {e}")))?,
        },
    })
}

fn decimal(s: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str(s).map_err(|e| StoreError::Corrupt(format!("amount '{s}': {e}")))
}
