//! The dashboard: the bounty balance, the latest transfers and the members'
//! post counts in a single response.

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
    notify::ChangeNotifier,
    read_model::{CurrentBounty, LiveView, MemberRanking, RecentTransactions},
};

/// The read models behind the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardViews {
    /// The shared bounty balance.
    pub bounty: LiveView<CurrentBounty>,
    /// The newest ledger entries.
    pub transactions: LiveView<RecentTransactions>,
    /// Every member with their post counts.
    pub members: LiveView<MemberRanking>,
}

impl DashboardViews {
    /// Load every view and start following `notifier`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start(db_connection: &Arc<Mutex<Connection>>, notifier: &ChangeNotifier) -> Self {
        Self {
            bounty: LiveView::start(db_connection.clone(), notifier),
            transactions: LiveView::start(db_connection.clone(), notifier),
            members: LiveView::start(db_connection.clone(), notifier),
        }
    }
}

impl FromRef<AppState> for DashboardViews {
    fn from_ref(state: &AppState) -> Self {
        state.dashboard.clone()
    }
}

/// A route handler for the dashboard data, served from the read models
/// without touching the database.
pub async fn get_dashboard_endpoint(State(views): State<DashboardViews>) -> Response {
    match dashboard_json(&views) {
        Ok(body) => Json(body).into_response(),
        Err(error) => error.into_response(),
    }
}

fn dashboard_json(views: &DashboardViews) -> Result<serde_json::Value, Error> {
    let bounty = views.bounty.snapshot()?;
    let transactions = views.transactions.snapshot()?;
    let members = views.members.snapshot()?;

    Ok(json!({
        "success": true,
        "bounty": bounty.amount,
        "transactions": transactions,
        "members": members,
    }))
}

#[cfg(test)]
mod dashboard_endpoint_tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use axum::{extract::State, http::StatusCode};
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        ledger::{insert_ledger_entry, test_utils::new_entry},
        member::{MemberName, NewMember, create_member},
        notify::{ChangeNotifier, ChangedRow, RowChangeEvent},
        test_utils::{assert_content_type, response_json},
    };

    use super::{DashboardViews, get_dashboard_endpoint};

    fn get_db_connection() -> Arc<Mutex<Connection>> {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        Arc::new(Mutex::new(connection))
    }

    #[tokio::test]
    async fn empty_dashboard() {
        let db_connection = get_db_connection();
        let views = DashboardViews::start(&db_connection, &ChangeNotifier::new());

        let response = get_dashboard_endpoint(State(views)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "application/json");
        let json = response_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["bounty"], 0.0);
        assert_eq!(json["transactions"], serde_json::json!([]));
        assert_eq!(json["members"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn shows_stored_rows_and_follows_new_ones() {
        let db_connection = get_db_connection();
        let notifier = ChangeNotifier::new();
        {
            let connection = db_connection.lock().unwrap();
            insert_ledger_entry(new_entry("2025-03-25 10:00:00", 100.0), &connection).unwrap();
            create_member(
                NewMember {
                    order: 1,
                    name: MemberName::new_unchecked("Ann"),
                    image: None,
                },
                &connection,
            )
            .unwrap();
        }
        let views = DashboardViews::start(&db_connection, &notifier);

        let entry = {
            let connection = db_connection.lock().unwrap();
            insert_ledger_entry(new_entry("2025-03-25 11:00:00", 250.0), &connection).unwrap()
        };
        notifier.publish(RowChangeEvent::insert(ChangedRow::LedgerEntry(entry)));

        let mut json = serde_json::Value::Null;
        for _ in 0..100 {
            json = response_json(get_dashboard_endpoint(State(views.clone())).await).await;
            if json["bounty"] == 250.0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(json["bounty"], 250.0);
        let transactions = json["transactions"].as_array().unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0]["accumulated"], 250.0);
        assert_eq!(json["members"][0]["name"], "Ann");
        assert_eq!(json["members"][0]["postsThisMonth"], 0);
    }
}
