//! Typed point-lookup fetching over the relational store.
//!
//! Records cross the store boundary as explicit structs: each row is decoded
//! field-by-field and rejected with a [`FetchError::RowShape`] when the
//! stored shape does not match, never coerced. Every fetch is exactly one
//! point query against one logical table; zero rows and more-than-one row
//! are both errors.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const CREDIT_CARDS_TABLE: &str = "credit_cards";
pub const TRANSACTIONS_TABLE: &str = "transactions";

/// Card-holder base record, keyed by `cc_num`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub cc_num: i64,
    pub expires: String,
    pub birthdate: String,
    pub sex: String,
    pub city: String,
    pub country: String,
}

/// Transaction base record, keyed by `tid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub tid: i64,
    pub cc_num: i64,
    pub category: String,
    pub datetime: String,
    pub amount: f64,
    pub city: String,
    pub country: String,
    pub fraud_label: i64,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no {table} record for key {key}")]
    RecordNotFound { table: &'static str, key: i64 },
    #[error("multiple {table} records for key {key}, expected exactly one")]
    MultipleRecords { table: &'static str, key: i64 },
    #[error("{table} row for key {key} has unexpected shape: {reason}")]
    RowShape {
        table: &'static str,
        key: i64,
        reason: String,
    },
    #[error("failed to open store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("query against {table} failed: {source}")]
    Query {
        table: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

/// Point-lookup capability over the two logical tables. Injected into the
/// derivers at call time; implementations own the connection lifecycle.
pub trait RecordFetcher: Send + Sync {
    fn credit_card(&self, cc_num: i64) -> Result<CardRecord, FetchError>;
    fn transaction(&self, tid: i64) -> Result<TransactionRecord, FetchError>;
}

/// [`RecordFetcher`] over an already-open sqlite connection. The connection
/// is mutex-guarded so one fetcher can back concurrent serving handlers.
pub struct SqliteRecordFetcher {
    conn: Mutex<Connection>,
}

impl SqliteRecordFetcher {
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: &Path) -> Result<Self, FetchError> {
        let conn = Connection::open(path).map_err(|source| FetchError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_connection(conn))
    }
}

impl RecordFetcher for SqliteRecordFetcher {
    fn credit_card(&self, cc_num: i64) -> Result<CardRecord, FetchError> {
        let conn = self
            .conn
            .lock()
            .expect("store connection lock should not be poisoned");
        fetch_one(&conn, CREDIT_CARDS_TABLE, "cc_num", cc_num, decode_card_row)
    }

    fn transaction(&self, tid: i64) -> Result<TransactionRecord, FetchError> {
        let conn = self
            .conn
            .lock()
            .expect("store connection lock should not be poisoned");
        fetch_one(
            &conn,
            TRANSACTIONS_TABLE,
            "tid",
            tid,
            decode_transaction_row,
        )
    }
}

fn fetch_one<T>(
    conn: &Connection,
    table: &'static str,
    key_column: &str,
    key: i64,
    decode: fn(&Row<'_>, i64) -> Result<T, FetchError>,
) -> Result<T, FetchError> {
    let query = |source| FetchError::Query { table, source };

    let sql = format!("SELECT * FROM {table} WHERE {key_column} = ?1");
    let mut stmt = conn.prepare(&sql).map_err(query)?;
    let mut rows = stmt.query(params![key]).map_err(query)?;

    let Some(row) = rows.next().map_err(query)? else {
        return Err(FetchError::RecordNotFound { table, key });
    };
    let record = decode(row, key)?;

    if rows.next().map_err(query)?.is_some() {
        return Err(FetchError::MultipleRecords { table, key });
    }

    debug!(component = "store", event = "store.fetch.one", table, key);
    Ok(record)
}

fn decode_card_row(row: &Row<'_>, key: i64) -> Result<CardRecord, FetchError> {
    let shape = |source: rusqlite::Error| FetchError::RowShape {
        table: CREDIT_CARDS_TABLE,
        key,
        reason: source.to_string(),
    };

    Ok(CardRecord {
        cc_num: row.get("cc_num").map_err(shape)?,
        expires: row.get("expires").map_err(shape)?,
        birthdate: row.get("birthdate").map_err(shape)?,
        sex: row.get("sex").map_err(shape)?,
        city: row.get("city").map_err(shape)?,
        country: row.get("country").map_err(shape)?,
    })
}

fn decode_transaction_row(row: &Row<'_>, key: i64) -> Result<TransactionRecord, FetchError> {
    let shape = |source: rusqlite::Error| FetchError::RowShape {
        table: TRANSACTIONS_TABLE,
        key,
        reason: source.to_string(),
    };

    Ok(TransactionRecord {
        tid: row.get("tid").map_err(shape)?,
        cc_num: row.get("cc_num").map_err(shape)?,
        category: row.get("category").map_err(shape)?,
        datetime: row.get("datetime").map_err(shape)?,
        amount: row.get("amount").map_err(shape)?,
        city: row.get("city").map_err(shape)?,
        country: row.get("country").map_err(shape)?,
        fraud_label: row.get("fraud_label").map_err(shape)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_fetcher() -> SqliteRecordFetcher {
        let conn = Connection::open_in_memory().expect("in-memory store opens");
        conn.execute_batch(
            "
            CREATE TABLE credit_cards (
                cc_num INTEGER,
                expires TEXT,
                birthdate TEXT,
                sex TEXT,
                city TEXT,
                country TEXT
            );
            CREATE TABLE transactions (
                tid INTEGER,
                cc_num INTEGER,
                category TEXT,
                datetime TEXT,
                amount REAL,
                city TEXT,
                country TEXT,
                fraud_label INTEGER
            );
            INSERT INTO credit_cards VALUES
                (4001, '01/25', '1990-06-01', 'F', 'Oslo', 'NO'),
                (4002, '09/23', '1985-02-17', 'M', 'Bergen', 'NO'),
                (4444, '05/27', '1970-01-01', 'F', 'Paris', 'FR'),
                (4444, '05/28', '1970-01-01', 'F', 'Paris', 'FR');
            INSERT INTO transactions VALUES
                (7001, 4001, 'grocery', '2023-03-10 14:30:00', 42.5, 'Oslo', 'NO', 0),
                (7002, 4002, 'travel', '2023-04-01 08:00:00', 910.0, 'Madrid', 'ES', 1);
            ",
        )
        .expect("seed succeeds");
        SqliteRecordFetcher::from_connection(conn)
    }

    #[test]
    fn card_row_decodes_into_typed_record() {
        let fetcher = seeded_fetcher();
        let record = fetcher.credit_card(4001).unwrap();
        assert_eq!(
            record,
            CardRecord {
                cc_num: 4001,
                expires: "01/25".to_string(),
                birthdate: "1990-06-01".to_string(),
                sex: "F".to_string(),
                city: "Oslo".to_string(),
                country: "NO".to_string(),
            }
        );
    }

    #[test]
    fn transaction_row_decodes_into_typed_record() {
        let fetcher = seeded_fetcher();
        let record = fetcher.transaction(7002).unwrap();
        assert_eq!(record.tid, 7002);
        assert_eq!(record.cc_num, 4002);
        assert_eq!(record.category, "travel");
        assert_eq!(record.datetime, "2023-04-01 08:00:00");
        assert_eq!(record.amount, 910.0);
        assert_eq!(record.fraud_label, 1);
    }

    #[test]
    fn missing_key_is_record_not_found() {
        let fetcher = seeded_fetcher();
        let err = fetcher.credit_card(9999).unwrap_err();
        assert!(matches!(
            err,
            FetchError::RecordNotFound {
                table: "credit_cards",
                key: 9999
            }
        ));

        let err = fetcher.transaction(9999).unwrap_err();
        assert!(matches!(
            err,
            FetchError::RecordNotFound {
                table: "transactions",
                key: 9999
            }
        ));
    }

    #[test]
    fn duplicate_key_is_never_silently_picked() {
        let fetcher = seeded_fetcher();
        let err = fetcher.credit_card(4444).unwrap_err();
        assert!(matches!(
            err,
            FetchError::MultipleRecords {
                table: "credit_cards",
                key: 4444
            }
        ));
    }

    #[test]
    fn unexpected_row_shape_is_rejected() {
        let conn = Connection::open_in_memory().expect("in-memory store opens");
        conn.execute_batch(
            "
            CREATE TABLE credit_cards (cc_num INTEGER, expires TEXT);
            INSERT INTO credit_cards VALUES (4001, '01/25');
            ",
        )
        .expect("seed succeeds");
        let fetcher = SqliteRecordFetcher::from_connection(conn);

        let err = fetcher.credit_card(4001).unwrap_err();
        match err {
            FetchError::RowShape { table, key, .. } => {
                assert_eq!(table, "credit_cards");
                assert_eq!(key, 4001);
            }
            other => panic!("expected RowShape, got {other:?}"),
        }
    }

    #[test]
    fn missing_table_surfaces_as_query_error() {
        let conn = Connection::open_in_memory().expect("in-memory store opens");
        let fetcher = SqliteRecordFetcher::from_connection(conn);

        let err = fetcher.transaction(1).unwrap_err();
        assert!(matches!(
            err,
            FetchError::Query {
                table: "transactions",
                ..
            }
        ));
    }
}
