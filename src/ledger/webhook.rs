//! The webhook endpoint that payment gateways call for every bank transfer.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    body::Bytes,
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    ledger::{LedgerEntry, NewLedgerEntry, insert_ledger_entry, payload::normalize_payload},
    notify::{ChangeNotifier, ChangedRow, RowChangeEvent},
};

/// The header some gateways use to send the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The state needed for recording a transfer.
#[derive(Debug, Clone)]
pub struct WebhookState {
    /// The database connection for the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Publishes the inserted ledger entries.
    pub notifier: ChangeNotifier,
    /// The shared secret the gateway must send, if configured.
    pub api_key: Option<String>,
}

impl FromRef<AppState> for WebhookState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            notifier: state.notifier.clone(),
            api_key: state.webhook_api_key.clone(),
        }
    }
}

/// A route handler for gateway notifications, appends one entry to the ledger.
///
/// The API key is checked before the body is parsed. The gateway is expected
/// to retry failed deliveries, nothing is retried here.
pub async fn record_transfer_endpoint(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(error) = check_api_key(state.api_key.as_deref(), &headers) {
        tracing::warn!("Rejected webhook request with a missing or invalid API key");
        return error.into_webhook_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::error!("Could not parse webhook body as JSON: {error}");
            return Error::MalformedPayload(error.to_string()).into_webhook_response();
        }
    };

    let new_entry = match normalize_payload(&payload, OffsetDateTime::now_utc()) {
        Ok(new_entry) => new_entry,
        Err(error) => {
            tracing::error!("Could not map webhook payload {payload} to a ledger entry: {error}");
            return error.into_webhook_response();
        }
    };

    let entry = match record_transfer(new_entry, &state) {
        Ok(entry) => entry,
        Err(error) => return error.into_webhook_response(),
    };

    tracing::info!(
        "Recorded {} transfer of {} ({:?}), bounty is now {}",
        entry.direction(),
        entry.amount(),
        entry.transaction_content,
        entry.accumulated
    );

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "New bounty record inserted successfully",
            "data": entry,
        })),
    )
        .into_response()
}

/// Insert the entry and publish it before the database lock is released, so
/// subscribers see ledger entries in insertion order.
fn record_transfer(new_entry: NewLedgerEntry, state: &WebhookState) -> Result<LedgerEntry, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let entry = insert_ledger_entry(new_entry, &connection)?;
    state
        .notifier
        .publish(RowChangeEvent::insert(ChangedRow::LedgerEntry(entry.clone())));

    Ok(entry)
}

/// Check the request carries `expected_key`, if one is configured.
///
/// The key is accepted as `Authorization: Bearer <key>`,
/// `Authorization: Apikey <key>` or `x-api-key: <key>`.
fn check_api_key(expected_key: Option<&str>, headers: &HeaderMap) -> Result<(), Error> {
    let Some(expected_key) = expected_key else {
        return Ok(());
    };

    let from_authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split_once(' '))
        .filter(|(scheme, _)| {
            scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("apikey")
        })
        .map(|(_, key)| key.trim());

    let from_api_key_header = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim);

    if [from_authorization, from_api_key_header]
        .into_iter()
        .flatten()
        .any(|key| key == expected_key)
    {
        Ok(())
    } else {
        Err(Error::Unauthorized)
    }
}
