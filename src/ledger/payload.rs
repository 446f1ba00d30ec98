//! Normalization of payment gateway notifications into ledger entries.
//!
//! Gateways deliver two shapes of payload:
//!
//! - a transfer with a direction, `transferType` ("in" or "out") and
//!   `transferAmount`, in camelCase;
//! - a pre-split entry with `amount_in` and `amount_out`, in snake_case.
//!
//! Both naming conventions are accepted for every field. When a field is
//! present under both names the snake_case value wins.

use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::{
    Error,
    ledger::{NewLedgerEntry, TransferDirection},
    timezone::format_gateway_date,
};

const GATEWAY: &[&str] = &["gateway"];
const TRANSACTION_DATE: &[&str] = &["transaction_date", "transactionDate"];
const ACCOUNT_NUMBER: &[&str] = &["account_number", "accountNumber"];
const SUB_ACCOUNT: &[&str] = &["sub_account", "subAccount"];
const TRANSFER_TYPE: &[&str] = &["transfer_type", "transferType"];
const TRANSFER_AMOUNT: &[&str] = &["transfer_amount", "transferAmount"];
const AMOUNT_IN: &[&str] = &["amount_in", "amountIn"];
const AMOUNT_OUT: &[&str] = &["amount_out", "amountOut"];
const ACCUMULATED: &[&str] = &["accumulated"];
const CODE: &[&str] = &["code"];
const TRANSACTION_CONTENT: &[&str] = &["transaction_content", "transactionContent", "content"];
const REFERENCE_NUMBER: &[&str] = &[
    "reference_number",
    "referenceNumber",
    "reference_code",
    "referenceCode",
];
const BODY: &[&str] = &["body", "description"];

/// Map a gateway notification onto a ledger entry.
///
/// `now` is used as the transaction date when the payload does not carry one.
/// The `accumulated` balance is copied as-is, it is not checked against
/// earlier entries.
///
/// # Errors
///
/// Returns [Error::MalformedPayload] if the payload is not a JSON object, has
/// an unknown transfer type, is missing the amount or the accumulated balance,
/// has a negative or non-numeric amount, or does not have exactly one non-zero
/// amount.
pub fn normalize_payload(payload: &Value, now: OffsetDateTime) -> Result<NewLedgerEntry, Error> {
    let object = payload
        .as_object()
        .ok_or_else(|| malformed("expected a JSON object"))?;

    let (amount_in, amount_out) = match text_field(object, TRANSFER_TYPE)? {
        Some(transfer_type) => {
            let direction = TransferDirection::parse(&transfer_type).ok_or_else(|| {
                malformed(&format!(
                    "unknown transfer type \"{transfer_type}\", expected \"in\" or \"out\""
                ))
            })?;
            let amount = number_field(object, TRANSFER_AMOUNT)?
                .ok_or_else(|| malformed("missing transfer amount"))?;

            match direction {
                TransferDirection::In => (amount, 0.0),
                TransferDirection::Out => (0.0, amount),
            }
        }
        None => (
            number_field(object, AMOUNT_IN)?.unwrap_or(0.0),
            number_field(object, AMOUNT_OUT)?.unwrap_or(0.0),
        ),
    };

    if amount_in < 0.0 || amount_out < 0.0 {
        return Err(malformed("amounts cannot be negative"));
    }

    if (amount_in > 0.0) == (amount_out > 0.0) {
        return Err(malformed(
            "exactly one of the incoming and outgoing amounts must be non-zero",
        ));
    }

    let accumulated = number_field(object, ACCUMULATED)?
        .ok_or_else(|| malformed("missing accumulated balance"))?;

    let transaction_date = match text_field(object, TRANSACTION_DATE)? {
        Some(date) => date,
        None => format_gateway_date(now)
            .map_err(|error| malformed(&format!("could not format the current date: {error}")))?,
    };

    Ok(NewLedgerEntry {
        gateway: text_field(object, GATEWAY)?,
        transaction_date,
        account_number: text_field(object, ACCOUNT_NUMBER)?,
        sub_account: text_field(object, SUB_ACCOUNT)?,
        amount_in,
        amount_out,
        accumulated,
        code: text_field(object, CODE)?,
        transaction_content: text_field(object, TRANSACTION_CONTENT)?,
        reference_number: text_field(object, REFERENCE_NUMBER)?,
        body: text_field(object, BODY)?,
    })
}

fn malformed(message: &str) -> Error {
    Error::MalformedPayload(message.to_owned())
}

/// Find the first of `keys` with a value, returning the key and value.
///
/// `null` and blank strings count as missing, so they never hide a value sent
/// under another alias.
fn field<'a>(
    object: &'a Map<String, Value>,
    keys: &[&'static str],
) -> Option<(&'static str, &'a Value)> {
    keys.iter().find_map(|&key| match object.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(value) => Some((key, value)),
    })
}

fn text_field(
    object: &Map<String, Value>,
    keys: &[&'static str],
) -> Result<Option<String>, Error> {
    match field(object, keys) {
        None => Ok(None),
        Some((_, Value::String(text))) => Ok(Some(text.clone())),
        // Account numbers and codes are sometimes sent as bare numbers.
        Some((_, Value::Number(number))) => Ok(Some(number.to_string())),
        Some((key, value)) => Err(malformed(&format!(
            "expected \"{key}\" to be a string, got {value}"
        ))),
    }
}

fn number_field(
    object: &Map<String, Value>,
    keys: &[&'static str],
) -> Result<Option<f64>, Error> {
    let (key, value) = match field(object, keys) {
        None => return Ok(None),
        Some(found) => found,
    };

    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(number) if number.is_finite() => Ok(Some(number)),
        _ => Err(malformed(&format!(
            "expected \"{key}\" to be a number, got {value}"
        ))),
    }
}
