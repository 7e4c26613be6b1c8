// Database module - SQLite connection, format registry and transaction store

pub mod models;

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::importers::{FormatRegistry, TransactionStore};
pub use models::{
    Account, ColumnSpec, FormatDescriptor, ImportBatch, Transaction, TransactionCandidate,
};

/// Get the default database path (~/.pocketbook/data.db)
pub fn get_default_db_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let pocketbook_dir = PathBuf::from(home).join(".pocketbook");

    std::fs::create_dir_all(&pocketbook_dir).context("Failed to create .pocketbook directory")?;

    Ok(pocketbook_dir.join("data.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;

    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("Failed to enable foreign keys")?;

    Ok(conn)
}

/// Initialize the database with schema
///
/// Safe to call on every start; all statements are `IF NOT EXISTS`.
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };

    info!("Initializing database at: {:?}", path);

    let conn = open_db(Some(path))?;
    conn.execute_batch(include_str!("schema.sql"))
        .context("Failed to execute schema")?;

    debug!("Database schema ready");
    Ok(())
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub fn insert_account(conn: &Connection, name: &str, bank_name: Option<&str>) -> Result<i64> {
    if name.trim().is_empty() {
        return Err(anyhow!("Account name cannot be empty"));
    }
    conn.execute(
        "INSERT INTO accounts (name, bank_name) VALUES (?1, ?2)",
        params![name.trim(), bank_name],
    )
    .with_context(|| format!("Failed to create account '{}'", name))?;

    Ok(conn.last_insert_rowid())
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            "SELECT id, name, bank_name, created_at FROM accounts WHERE id = ?1",
            [id],
            account_from_row,
        )
        .optional()?;
    Ok(account)
}

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt =
        conn.prepare("SELECT id, name, bank_name, created_at FROM accounts ORDER BY id")?;
    let accounts = stmt
        .query_map([], account_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(accounts)
}

fn account_from_row(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        bank_name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

// ---------------------------------------------------------------------------
// Statement formats
// ---------------------------------------------------------------------------

const FORMAT_COLUMNS: &str = "id, name, bank_name, data_start_row,
    date_column_kind, date_column_value,
    narration_column_kind, narration_column_value,
    withdrawal_column_kind, withdrawal_column_value,
    deposit_column_kind, deposit_column_value";

/// Insert a new statement format, returns its id
pub fn insert_format(conn: &Connection, format: &FormatDescriptor) -> Result<i64> {
    format.validate().map_err(|e| anyhow!(e))?;

    conn.execute(
        "INSERT INTO statement_formats (
            name, bank_name, data_start_row,
            date_column_kind, date_column_value,
            narration_column_kind, narration_column_value,
            withdrawal_column_kind, withdrawal_column_value,
            deposit_column_kind, deposit_column_value
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            format.name,
            format.bank_name,
            format.data_start_row as i64,
            format.date_column.kind(),
            format.date_column.value(),
            format.narration_column.kind(),
            format.narration_column.value(),
            format.withdrawal_column.kind(),
            format.withdrawal_column.value(),
            format.deposit_column.kind(),
            format.deposit_column.value(),
        ],
    )
    .with_context(|| format!("Failed to save format '{}'", format.name))?;

    let id = conn.last_insert_rowid();
    info!("Saved statement format '{}' with id {}", format.name, id);
    Ok(id)
}

pub fn get_format(conn: &Connection, id: i64) -> Result<Option<FormatDescriptor>> {
    let sql = format!("SELECT {} FROM statement_formats WHERE id = ?1", FORMAT_COLUMNS);
    let format = conn.query_row(&sql, [id], format_from_row).optional()?;
    Ok(format)
}

pub fn list_formats(conn: &Connection) -> Result<Vec<FormatDescriptor>> {
    let sql = format!("SELECT {} FROM statement_formats ORDER BY id", FORMAT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let formats = stmt
        .query_map([], format_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(formats)
}

/// Replace every field of an existing format. Returns false if `id` is unknown.
pub fn update_format(conn: &Connection, id: i64, format: &FormatDescriptor) -> Result<bool> {
    format.validate().map_err(|e| anyhow!(e))?;

    let changed = conn.execute(
        "UPDATE statement_formats SET
            name = ?1, bank_name = ?2, data_start_row = ?3,
            date_column_kind = ?4, date_column_value = ?5,
            narration_column_kind = ?6, narration_column_value = ?7,
            withdrawal_column_kind = ?8, withdrawal_column_value = ?9,
            deposit_column_kind = ?10, deposit_column_value = ?11,
            updated_at = CURRENT_TIMESTAMP
         WHERE id = ?12",
        params![
            format.name,
            format.bank_name,
            format.data_start_row as i64,
            format.date_column.kind(),
            format.date_column.value(),
            format.narration_column.kind(),
            format.narration_column.value(),
            format.withdrawal_column.kind(),
            format.withdrawal_column.value(),
            format.deposit_column.kind(),
            format.deposit_column.value(),
            id,
        ],
    )?;

    Ok(changed > 0)
}

/// Returns false if `id` is unknown. Past import batches keep their rows.
pub fn delete_format(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM statement_formats WHERE id = ?1", [id])?;
    Ok(changed > 0)
}

fn format_from_row(row: &Row) -> Result<FormatDescriptor, rusqlite::Error> {
    let data_start_row: i64 = row.get(3)?;
    Ok(FormatDescriptor {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        bank_name: row.get(2)?,
        data_start_row: usize::try_from(data_start_row).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Integer, Box::new(e))
        })?,
        date_column: get_column_spec(row, 4)?,
        narration_column: get_column_spec(row, 6)?,
        withdrawal_column: get_column_spec(row, 8)?,
        deposit_column: get_column_spec(row, 10)?,
    })
}

/// Read a kind/value column pair starting at `idx`
fn get_column_spec(row: &Row, idx: usize) -> Result<ColumnSpec, rusqlite::Error> {
    let kind: String = row.get(idx)?;
    let value: String = row.get(idx + 1)?;
    ColumnSpec::from_parts(&kind, &value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(StoreError(e)),
        )
    })
}

impl FormatRegistry for Connection {
    fn find_format(&self, id: i64) -> Result<Option<FormatDescriptor>> {
        get_format(self, id)
    }
}

// ---------------------------------------------------------------------------
// Transactions and import batches
// ---------------------------------------------------------------------------

/// Transaction store backed by a SQLite connection
pub struct SqliteStore<'a> {
    conn: &'a mut Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        Self { conn }
    }
}

impl TransactionStore for SqliteStore<'_> {
    fn insert_batch(
        &mut self,
        batch: &ImportBatch,
        candidates: &[TransactionCandidate],
    ) -> Result<Vec<i64>, StoreError> {
        // Dropping `tx` without commit rolls everything back
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO import_batches (
                account_id, format_id, file_name, file_hash,
                accepted_count, rejected_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                batch.account_id,
                batch.format_id,
                batch.file_name,
                batch.file_hash,
                batch.accepted_count as i64,
                batch.rejected_count as i64,
                batch.created_at,
            ],
        )?;
        let batch_id = tx.last_insert_rowid();

        let mut ids = Vec::with_capacity(candidates.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO transactions (
                    account_id, occurred_at, narration,
                    withdrawal_amount, deposit_amount,
                    source, source_file, import_batch_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, 'IMPORT', ?6, ?7)",
            )?;

            for candidate in candidates {
                stmt.execute(params![
                    candidate.account_id,
                    candidate.occurred_at,
                    candidate.narration,
                    candidate.withdrawal_amount.to_string(),
                    candidate.deposit_amount.to_string(),
                    batch.file_name,
                    batch_id,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }

        tx.commit()?;
        debug!("Committed import batch {} with {} transactions", batch_id, ids.len());
        Ok(ids)
    }
}

/// Transactions for an account, oldest first
pub fn list_transactions(
    conn: &Connection,
    account_id: i64,
    limit: Option<usize>,
) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, account_id, occurred_at, narration, withdrawal_amount, deposit_amount,
                source, source_file, import_batch_id, created_at
         FROM transactions
         WHERE account_id = ?1
         ORDER BY occurred_at ASC, id ASC
         LIMIT ?2",
    )?;

    // SQLite treats a negative LIMIT as unbounded
    let limit = limit.map_or(-1, |l| l as i64);
    let transactions = stmt
        .query_map(params![account_id, limit], |row| {
            Ok(Transaction {
                id: Some(row.get(0)?),
                account_id: row.get(1)?,
                occurred_at: row.get(2)?,
                narration: row.get(3)?,
                withdrawal_amount: get_decimal_value(row, 4)?,
                deposit_amount: get_decimal_value(row, 5)?,
                source: row.get(6)?,
                source_file: row.get(7)?,
                import_batch_id: row.get(8)?,
                created_at: row.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

pub fn list_import_batches(conn: &Connection, account_id: i64) -> Result<Vec<ImportBatch>> {
    let mut stmt = conn.prepare(
        "SELECT id, account_id, format_id, file_name, file_hash,
                accepted_count, rejected_count, created_at
         FROM import_batches
         WHERE account_id = ?1
         ORDER BY id",
    )?;

    let batches = stmt
        .query_map([account_id], |row| {
            Ok(ImportBatch {
                id: Some(row.get(0)?),
                account_id: row.get(1)?,
                format_id: row.get(2)?,
                file_name: row.get(3)?,
                file_hash: row.get(4)?,
                accepted_count: row.get::<_, i64>(5)? as usize,
                rejected_count: row.get::<_, i64>(6)? as usize,
                created_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(batches)
}

/// Helper to read Decimal from SQLite (handles both TEXT and INTEGER/REAL)
pub fn get_decimal_value(row: &Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Decimal::from_str(s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        }
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => Decimal::try_from(f).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Real, Box::new(e))
        }),
        _ => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            rusqlite::types::Type::Null,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn test_conn() -> (tempfile::TempDir, Connection) {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        init_database(Some(db_path.clone())).unwrap();
        let conn = open_db(Some(db_path)).unwrap();
        (temp_dir, conn)
    }

    fn sample_format() -> FormatDescriptor {
        FormatDescriptor {
            id: None,
            name: "HDFC Savings".into(),
            bank_name: Some("HDFC".into()),
            data_start_row: 2,
            date_column: ColumnSpec::Letter("A".into()),
            narration_column: ColumnSpec::Name("Narration".into()),
            withdrawal_column: ColumnSpec::Index(2),
            deposit_column: ColumnSpec::Letter("D".into()),
        }
    }

    fn candidate(narration: &str, withdrawal: Decimal, deposit: Decimal) -> TransactionCandidate {
        TransactionCandidate {
            account_id: 1,
            occurred_at: NaiveDate::from_ymd_opt(2024, 1, 5)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            narration: narration.into(),
            withdrawal_amount: withdrawal,
            deposit_amount: deposit,
            row_index: 2,
        }
    }

    fn batch(account_id: i64, accepted: usize) -> ImportBatch {
        ImportBatch {
            id: None,
            account_id,
            format_id: None,
            file_name: Some("jan.xlsx".into()),
            file_hash: "abc".into(),
            accepted_count: accepted,
            rejected_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_init_database_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        init_database(Some(db_path.clone())).unwrap();
        init_database(Some(db_path.clone())).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let table_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN
                 ('accounts', 'statement_formats', 'import_batches', 'transactions')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 4);
    }

    #[test]
    fn test_format_crud_round_trips_column_kinds() {
        let (_dir, conn) = test_conn();
        let id = insert_format(&conn, &sample_format()).unwrap();

        let stored = get_format(&conn, id).unwrap().unwrap();
        assert_eq!(stored.id, Some(id));
        assert_eq!(stored.narration_column, ColumnSpec::Name("Narration".into()));
        assert_eq!(stored.withdrawal_column, ColumnSpec::Index(2));

        let mut updated = stored.clone();
        updated.data_start_row = 5;
        updated.deposit_column = ColumnSpec::Name("Credit".into());
        assert!(update_format(&conn, id, &updated).unwrap());
        let reloaded = conn.find_format(id).unwrap().unwrap();
        assert_eq!(reloaded.data_start_row, 5);
        assert_eq!(reloaded.deposit_column, ColumnSpec::Name("Credit".into()));

        assert_eq!(list_formats(&conn).unwrap().len(), 1);
        assert!(delete_format(&conn, id).unwrap());
        assert!(!delete_format(&conn, id).unwrap());
        assert!(conn.find_format(id).unwrap().is_none());
    }

    #[test]
    fn test_insert_format_rejects_zero_start_row() {
        let (_dir, conn) = test_conn();
        let mut format = sample_format();
        format.data_start_row = 0;
        assert!(insert_format(&conn, &format).is_err());
    }

    #[test]
    fn test_store_persists_batch_with_decimal_text() {
        let (_dir, mut conn) = test_conn();
        let account_id = insert_account(&conn, "Savings", Some("HDFC")).unwrap();

        let mut first = candidate("UPI/COFFEE", dec!(4.50), Decimal::ZERO);
        first.account_id = account_id;
        let mut second = candidate("SALARY", Decimal::ZERO, dec!(2000.00));
        second.account_id = account_id;

        let ids = SqliteStore::new(&mut conn)
            .insert_batch(&batch(account_id, 2), &[first, second])
            .unwrap();
        assert_eq!(ids.len(), 2);

        let stored = list_transactions(&conn, account_id, None).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].withdrawal_amount, dec!(4.50));
        assert_eq!(stored[1].deposit_amount, dec!(2000.00));
        assert_eq!(stored[0].source, "IMPORT");
        assert_eq!(stored[0].source_file.as_deref(), Some("jan.xlsx"));
        assert!(stored[0].import_batch_id.is_some());

        let text: String = conn
            .query_row(
                "SELECT withdrawal_amount FROM transactions WHERE id = ?1",
                [ids[0]],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(text, "4.50");

        let batches = list_import_batches(&conn, account_id).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].accepted_count, 2);
    }

    #[test]
    fn test_store_rolls_back_on_failure() {
        let (_dir, mut conn) = test_conn();
        let account_id = insert_account(&conn, "Savings", None).unwrap();

        let mut good = candidate("OK", dec!(1), Decimal::ZERO);
        good.account_id = account_id;
        // Unknown account violates the foreign key on the second insert
        let mut bad = candidate("BAD", dec!(1), Decimal::ZERO);
        bad.account_id = account_id + 100;

        let result = SqliteStore::new(&mut conn).insert_batch(&batch(account_id, 2), &[good, bad]);
        assert!(result.is_err());

        assert!(list_transactions(&conn, account_id, None).unwrap().is_empty());
        assert!(list_import_batches(&conn, account_id).unwrap().is_empty());
    }

    #[test]
    fn test_list_transactions_limit() {
        let (_dir, mut conn) = test_conn();
        let account_id = insert_account(&conn, "Savings", None).unwrap();
        let rows: Vec<_> = (0..3)
            .map(|i| {
                let mut c = candidate(&format!("T{}", i), dec!(1), Decimal::ZERO);
                c.account_id = account_id;
                c
            })
            .collect();
        SqliteStore::new(&mut conn)
            .insert_batch(&batch(account_id, 3), &rows)
            .unwrap();

        assert_eq!(list_transactions(&conn, account_id, Some(2)).unwrap().len(), 2);
        assert_eq!(list_transactions(&conn, account_id, None).unwrap().len(), 3);
    }

    #[test]
    fn test_accounts() {
        let (_dir, conn) = test_conn();
        assert!(insert_account(&conn, "  ", None).is_err());
        let id = insert_account(&conn, "Checking", Some("SBI")).unwrap();
        assert!(insert_account(&conn, "Checking", None).is_err());

        let account = get_account(&conn, id).unwrap().unwrap();
        assert_eq!(account.name, "Checking");
        assert_eq!(account.bank_name.as_deref(), Some("SBI"));
        assert_eq!(list_accounts(&conn).unwrap().len(), 1);
        assert!(get_account(&conn, id + 1).unwrap().is_none());
    }
}
