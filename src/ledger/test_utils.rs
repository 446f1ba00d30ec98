use crate::ledger::{LedgerEntry, NewLedgerEntry};

/// An incoming transfer of 1000 on `transaction_date` with the given balance.
pub fn new_entry(transaction_date: &str, accumulated: f64) -> NewLedgerEntry {
    NewLedgerEntry {
        gateway: Some("TPBank".to_owned()),
        transaction_date: transaction_date.to_owned(),
        account_number: Some("10001009980".to_owned()),
        sub_account: None,
        amount_in: 1000.0,
        amount_out: 0.0,
        accumulated,
        code: None,
        transaction_content: Some("donation".to_owned()),
        reference_number: None,
        body: None,
    }
}

/// A stored entry with `id` and the given balance.
pub fn sample_entry(id: i64, accumulated: f64) -> LedgerEntry {
    new_entry("2025-01-01 08:00:00", accumulated).with_id(id)
}
