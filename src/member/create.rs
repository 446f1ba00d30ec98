//! Member creation endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, Error, endpoints,
    extract::JsonBody,
    member::{MemberName, NewMember, create_member, domain::MemberFormData},
    notify::{ChangeNotifier, ChangedRow, RowChangeEvent},
};

/// The state needed for creating a member.
#[derive(Debug, Clone)]
pub struct CreateMemberState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub notifier: ChangeNotifier,
}

impl FromRef<AppState> for CreateMemberState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            notifier: state.notifier.clone(),
        }
    }
}

/// A route handler for creating a member, responds with the new member and
/// its location.
pub async fn create_member_endpoint(
    State(state): State<CreateMemberState>,
    JsonBody(form): JsonBody<MemberFormData>,
) -> Response {
    let name = match MemberName::new(&form.name) {
        Ok(name) => name,
        Err(error) => return error.into_response(),
    };

    let new_member = NewMember {
        order: form.order,
        name,
        image: form.image,
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match create_member(new_member, &connection) {
        Ok(member) => {
            state
                .notifier
                .publish(RowChangeEvent::insert(ChangedRow::Member(member.clone())));

            let location = endpoints::member_endpoint(member.id);

            (
                StatusCode::CREATED,
                [(LOCATION, location)],
                Json(json!({ "success": true, "member": member })),
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a member: {error}");
            error.into_response()
        }
    }
}
