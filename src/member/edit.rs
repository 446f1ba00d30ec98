//! Member update endpoint.

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
    member::{MemberId, domain::MemberPatch, update_member},
    notify::{ChangeNotifier, ChangedRow, RowChangeEvent},
};

/// The state needed for updating a member.
#[derive(Debug, Clone)]
pub struct EditMemberState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub notifier: ChangeNotifier,
}

impl FromRef<AppState> for EditMemberState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            notifier: state.notifier.clone(),
        }
    }
}

/// A route handler for partially updating a member's name, image or order.
pub async fn update_member_endpoint(
    State(state): State<EditMemberState>,
    PathParam(member_id): PathParam<MemberId>,
    JsonBody(patch): JsonBody<MemberPatch>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match update_member(member_id, &patch, &connection) {
        Ok(member) => {
            if !patch.is_empty() {
                state
                    .notifier
                    .publish(RowChangeEvent::update(ChangedRow::Member(member.clone())));
            }

            Json(json!({ "success": true, "member": member })).into_response()
        }
        Err(error @ (Error::UpdateMissingMember | Error::EmptyMemberName)) => {
            error.into_response()
        }
        Err(error) => {
            tracing::error!("Could not update member {member_id}: {error}");
            error.into_response()
        }
    }
}
