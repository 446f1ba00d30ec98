//! Bounty Board is a small community dashboard.
//!
//! It tracks how many posts each member has contributed, shows a shared monthly
//! bounty balance funded by bank transfers, and lists the most recent transfers.
//!
//! This library provides a JSON REST API backed by SQLite, a webhook receiver
//! for payment gateway notifications, and in-memory read models that are kept
//! in sync through change notifications.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod extract;
mod ledger;
mod logging;
mod member;
mod not_found;
mod notify;
mod read_model;
mod reset;
mod routing;
#[cfg(test)]
mod test_utils;
mod timezone;

pub use app_state::AppState;
pub use database_id::DatabaseId;
pub use db::initialize as initialize_db;
pub use ledger::{
    LedgerEntry, NewLedgerEntry, TransferDirection, get_current_bounty, get_recent_transactions,
    insert_ledger_entry,
};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use member::{Member, MemberName, NewMember, create_member};
pub use notify::{ChangeKind, ChangeNotifier, ChangedRow, Collection, RowChangeEvent, Subscription};
pub use read_model::{CurrentBounty, LiveView, MemberRanking, ReadModel, RecentTransactions};
pub use reset::{
    check_month_reset, reset_monthly_counters_if_due, run_monthly_reset_task,
    should_reset_monthly_counters,
};
pub use routing::{REQUEST_BODY_LIMIT, build_router};
pub use timezone::DASHBOARD_OFFSET;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An empty string was used as a member name.
    #[error("member name cannot be empty")]
    EmptyMemberName,

    /// The request body could not be deserialized into the expected shape,
    /// e.g., a required field is missing or has the wrong type.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The webhook body could not be parsed or mapped onto a ledger entry.
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// The request body was larger than [REQUEST_BODY_LIMIT].
    #[error("the request body is too large")]
    PayloadTooLarge,

    /// The webhook API key was missing or did not match the configured key.
    #[error("unauthorized")]
    Unauthorized,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a member that does not exist
    #[error("tried to update a member that is not in the database")]
    UpdateMissingMember,

    /// Tried to delete a member that does not exist
    #[error("tried to delete a member that is not in the database")]
    DeleteMissingMember,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Could not acquire the lock on an in-memory read model
    #[error("could not acquire the read model lock")]
    ReadModelLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code that best describes the error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::EmptyMemberName | Error::InvalidRequest(_) | Error::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::NotFound | Error::UpdateMissingMember | Error::DeleteMissingMember => {
                StatusCode::NOT_FOUND
            }
            Error::SqlError(_) | Error::DatabaseLockError | Error::ReadModelLockError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message that is safe to show to API clients.
    ///
    /// Internal errors are replaced with a generic message, the details are
    /// logged on the server instead.
    fn client_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => {
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            _ => self.to_string(),
        }
    }

    /// Convert the error into the envelope used by the webhook endpoint, which
    /// reports failures under `message` instead of `error`.
    fn into_webhook_response(self) -> Response {
        let status = self.status_code();

        let message = match self {
            Error::Unauthorized => "Unauthorized".to_owned(),
            Error::SqlError(_) | Error::DatabaseLockError => {
                tracing::error!("Could not insert bounty record: {self}");
                "Error inserting bounty record".to_owned()
            }
            error => error.client_message(),
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);
        }

        (
            status,
            Json(json!({ "success": false, "error": self.client_message() })),
        )
            .into_response()
    }
}
