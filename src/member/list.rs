//! Member listing endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{AppState, Error, member::get_all_members};

/// The state needed for listing members.
#[derive(Debug, Clone)]
pub struct ListMembersState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListMembersState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that responds with every stored member.
///
/// Members are returned in storage order, sorting them for display is up to the client.
pub async fn list_members_endpoint(State(state): State<ListMembersState>) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match get_all_members(&connection) {
        Ok(members) => Json(json!({ "success": true, "members": members })).into_response(),
        Err(error) => {
            tracing::error!("Could not get members: {error}");
            error.into_response()
        }
    }
}
