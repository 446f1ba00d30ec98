//! Member deletion endpoint.

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
    extract::PathParam,
    member::{MemberId, delete_member},
    notify::{ChangeNotifier, ChangedRow, RowChangeEvent},
};

/// The state needed for deleting a member.
#[derive(Debug, Clone)]
pub struct DeleteMemberState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub notifier: ChangeNotifier,
}

impl FromRef<AppState> for DeleteMemberState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            notifier: state.notifier.clone(),
        }
    }
}

/// A route handler for deleting a member.
///
/// Deleting a member that does not exist is an error, not a no-op.
pub async fn delete_member_endpoint(
    State(state): State<DeleteMemberState>,
    PathParam(member_id): PathParam<MemberId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match delete_member(member_id, &connection) {
        Ok(member) => {
            state
                .notifier
                .publish(RowChangeEvent::delete(ChangedRow::Member(member)));

            Json(json!({ "success": true, "message": "Member deleted successfully" }))
                .into_response()
        }
        Err(Error::DeleteMissingMember) => Error::DeleteMissingMember.into_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting member {member_id}: {error}"
            );
            error.into_response()
        }
    }
}

#[cfg(test)]
mod delete_member_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::State,
        http::StatusCode,
    };
    use rusqlite::Connection;

    use crate::{
        Error,
        extract::PathParam,
        member::{MemberName, NewMember, create_member, create_member_table, get_member},
        notify::{ChangeKind, ChangeNotifier, ChangedRow, Collection},
        test_utils::response_json,
    };

    use super::{DeleteMemberState, delete_member_endpoint};

    fn get_state() -> DeleteMemberState {
        let connection = Connection::open_in_memory().unwrap();
        create_member_table(&connection).unwrap();

        DeleteMemberState {
            db_connection: Arc::new(Mutex::new(connection)),
            notifier: ChangeNotifier::new(),
        }
    }

    #[tokio::test]
    async fn deletes_member() {
        let state = get_state();
        let member = create_member(
            NewMember {
                order: 1,
                name: MemberName::new_unchecked("Ann"),
                image: None,
            },
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();
        let mut subscription = state
            .notifier
            .subscribe(Collection::Members, &[ChangeKind::Delete]);

        let response =
            delete_member_endpoint(State(state.clone()), PathParam(member.id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Member deleted successfully");
        assert_eq!(
            get_member(member.id, &state.db_connection.lock().unwrap()),
            Err(Error::NotFound)
        );
        let event = subscription.next().await.unwrap();
        assert_eq!(event.row, ChangedRow::Member(member));
    }

    #[tokio::test]
    async fn deleting_missing_member_is_not_found() {
        let state = get_state();

        let response = delete_member_endpoint(State(state), PathParam(1337)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = response_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(
            json["error"],
            "tried to delete a member that is not in the database"
        );
    }
}
