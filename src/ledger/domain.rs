//! Core ledger domain types.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::database_id::DatabaseId;

/// Database identifier for a ledger entry.
pub type LedgerEntryId = DatabaseId;

/// Whether money came into or went out of the bounty account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    /// Money was paid into the account.
    In,
    /// Money was paid out of the account.
    Out,
}

impl TransferDirection {
    /// Parse the gateway's `transferType` discriminator.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            _ => None,
        }
    }
}

impl Display for TransferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferDirection::In => write!(f, "in"),
            TransferDirection::Out => write!(f, "out"),
        }
    }
}

/// A bank transfer recorded against the shared bounty balance.
///
/// Exactly one of `amount_in` and `amount_out` is non-zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// The ID assigned by the store.
    pub id: LedgerEntryId,
    /// The bank or gateway that reported the transfer.
    pub gateway: Option<String>,
    /// When the transfer happened, as reported by the gateway.
    pub transaction_date: String,
    /// The bank account number.
    pub account_number: Option<String>,
    /// The virtual sub-account, if any.
    pub sub_account: Option<String>,
    /// The amount paid in.
    pub amount_in: f64,
    /// The amount paid out.
    pub amount_out: f64,
    /// The account balance reported by the gateway after this transfer.
    pub accumulated: f64,
    /// The payment code detected by the gateway.
    pub code: Option<String>,
    /// The transfer description entered by the sender.
    pub transaction_content: Option<String>,
    /// The bank's reference number for the transfer.
    pub reference_number: Option<String>,
    /// The full notification text.
    pub body: Option<String>,
}

impl LedgerEntry {
    /// The direction of the transfer.
    pub fn direction(&self) -> TransferDirection {
        if self.amount_in > 0.0 {
            TransferDirection::In
        } else {
            TransferDirection::Out
        }
    }

    /// The non-zero amount of the transfer.
    pub fn amount(&self) -> f64 {
        match self.direction() {
            TransferDirection::In => self.amount_in,
            TransferDirection::Out => self.amount_out,
        }
    }
}

/// A normalized ledger entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    /// The bank or gateway that reported the transfer.
    pub gateway: Option<String>,
    /// When the transfer happened.
    pub transaction_date: String,
    /// The bank account number.
    pub account_number: Option<String>,
    /// The virtual sub-account, if any.
    pub sub_account: Option<String>,
    /// The amount paid in.
    pub amount_in: f64,
    /// The amount paid out.
    pub amount_out: f64,
    /// The balance reported by the gateway.
    pub accumulated: f64,
    /// The payment code detected by the gateway.
    pub code: Option<String>,
    /// The transfer description.
    pub transaction_content: Option<String>,
    /// The bank's reference number.
    pub reference_number: Option<String>,
    /// The full notification text.
    pub body: Option<String>,
}

impl NewLedgerEntry {
    /// Attach the store assigned `id`.
    pub fn with_id(self, id: LedgerEntryId) -> LedgerEntry {
        LedgerEntry {
            id,
            gateway: self.gateway,
            transaction_date: self.transaction_date,
            account_number: self.account_number,
            sub_account: self.sub_account,
            amount_in: self.amount_in,
            amount_out: self.amount_out,
            accumulated: self.accumulated,
            code: self.code,
            transaction_content: self.transaction_content,
            reference_number: self.reference_number,
            body: self.body,
        }
    }
}
