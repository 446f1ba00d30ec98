//! Database operations for the bounty ledger.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{
    Error,
    ledger::{LedgerEntry, NewLedgerEntry},
};

/// How many entries [get_recent_transactions] returns.
pub const RECENT_TRANSACTION_LIMIT: usize = 10;

const LEDGER_COLUMNS: &str = "id, gateway, transaction_date, account_number, sub_account, \
    amount_in, amount_out, accumulated, code, transaction_content, reference_number, body";

/// Initialize the ledger table and indexes.
pub fn create_ledger_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS bounty (
            id INTEGER PRIMARY KEY,
            gateway TEXT,
            transaction_date TEXT NOT NULL,
            account_number TEXT,
            sub_account TEXT,
            amount_in REAL NOT NULL DEFAULT 0 CHECK (amount_in >= 0),
            amount_out REAL NOT NULL DEFAULT 0 CHECK (amount_out >= 0),
            accumulated REAL NOT NULL,
            code TEXT,
            transaction_content TEXT,
            reference_number TEXT,
            body TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_bounty_transaction_date ON bounty(transaction_date);",
    )?;

    Ok(())
}

/// Append an entry to the ledger and return it with its generated ID.
pub fn insert_ledger_entry(
    entry: NewLedgerEntry,
    connection: &Connection,
) -> Result<LedgerEntry, Error> {
    connection.execute(
        "INSERT INTO bounty (
            gateway, transaction_date, account_number, sub_account, amount_in, amount_out,
            accumulated, code, transaction_content, reference_number, body
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            entry.gateway,
            entry.transaction_date,
            entry.account_number,
            entry.sub_account,
            entry.amount_in,
            entry.amount_out,
            entry.accumulated,
            entry.code,
            entry.transaction_content,
            entry.reference_number,
            entry.body,
        ],
    )?;

    let id = connection.last_insert_rowid();

    Ok(entry.with_id(id))
}

/// Get the most recently inserted entry, if there is one.
pub fn get_latest_entry(connection: &Connection) -> Result<Option<LedgerEntry>, Error> {
    connection
        .prepare(&format!(
            "SELECT {LEDGER_COLUMNS} FROM bounty ORDER BY id DESC LIMIT 1"
        ))?
        .query_row([], map_row_to_entry)
        .optional()
        .map_err(Error::from)
}

/// Get the current bounty balance: the `accumulated` value of the most
/// recently inserted entry, or zero when the ledger is empty.
pub fn get_current_bounty(connection: &Connection) -> Result<f64, Error> {
    Ok(get_latest_entry(connection)?
        .map(|entry| entry.accumulated)
        .unwrap_or(0.0))
}

/// Get the [RECENT_TRANSACTION_LIMIT] entries with the latest transaction
/// dates, newest first.
pub fn get_recent_transactions(connection: &Connection) -> Result<Vec<LedgerEntry>, Error> {
    connection
        .prepare(&format!(
            "SELECT {LEDGER_COLUMNS} FROM bounty
            ORDER BY transaction_date DESC, id DESC
            LIMIT :limit"
        ))?
        .query_map(
            &[(":limit", &(RECENT_TRANSACTION_LIMIT as i64))],
            map_row_to_entry,
        )?
        .map(|maybe_entry| maybe_entry.map_err(|error| error.into()))
        .collect()
}

fn map_row_to_entry(row: &Row) -> Result<LedgerEntry, rusqlite::Error> {
    Ok(LedgerEntry {
        id: row.get(0)?,
        gateway: row.get(1)?,
        transaction_date: row.get(2)?,
        account_number: row.get(3)?,
        sub_account: row.get(4)?,
        amount_in: row.get(5)?,
        amount_out: row.get(6)?,
        accumulated: row.get(7)?,
        code: row.get(8)?,
        transaction_content: row.get(9)?,
        reference_number: row.get(10)?,
        body: row.get(11)?,
    })
}
