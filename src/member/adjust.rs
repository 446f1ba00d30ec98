//! Endpoint for incrementing or decrementing a member's post counters.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error,
    extract::{JsonBody, PathParam},
    member::{MemberId, adjust_post_count, domain::AdjustPostCountData},
    notify::{ChangeNotifier, ChangedRow, RowChangeEvent},
};

/// The state needed for adjusting post counters.
#[derive(Debug, Clone)]
pub struct AdjustPostCountState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub notifier: ChangeNotifier,
}

impl FromRef<AppState> for AdjustPostCountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            notifier: state.notifier.clone(),
        }
    }
}

/// A route handler that adds one to, or removes one from, both of a member's
/// post counters. Counters never go below zero.
pub async fn adjust_post_count_endpoint(
    State(state): State<AdjustPostCountState>,
    PathParam(member_id): PathParam<MemberId>,
    JsonBody(data): JsonBody<AdjustPostCountData>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match adjust_post_count(member_id, data.increment, &connection) {
        Ok(member) => {
            state
                .notifier
                .publish(RowChangeEvent::update(ChangedRow::Member(member.clone())));

            Json(json!({ "success": true, "member": member })).into_response()
        }
        Err(Error::NotFound) => Error::NotFound.into_response(),
        Err(error) => {
            tracing::error!("Could not adjust post count for member {member_id}: {error}");
            error.into_response()
        }
    }
}
