//! The bounty ledger: bank transfers pushed by the payment gateway.

mod db;
mod domain;
mod payload;
#[cfg(test)]
pub(crate) mod test_utils;
mod webhook;

pub use db::{
    RECENT_TRANSACTION_LIMIT, create_ledger_table, get_current_bounty, get_latest_entry,
    get_recent_transactions, insert_ledger_entry,
};
pub use domain::{LedgerEntry, LedgerEntryId, NewLedgerEntry, TransferDirection};
pub use webhook::{API_KEY_HEADER, record_transfer_endpoint};
