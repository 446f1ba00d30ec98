//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{Error, dashboard::DashboardViews, db::initialize, notify::ChangeNotifier};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// Publishes every write to the members and the ledger.
    pub notifier: ChangeNotifier,

    /// The key payment gateways must present when calling the webhook.
    /// Requests are not checked when this is `None`.
    pub webhook_api_key: Option<String>,

    /// The read models served by the dashboard.
    pub dashboard: DashboardViews,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models,
    /// then load the dashboard read models and start keeping them up to date.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub fn new(db_connection: Connection, webhook_api_key: Option<&str>) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));
        let notifier = ChangeNotifier::new();
        let dashboard = DashboardViews::start(&connection, &notifier);

        Ok(Self {
            db_connection: connection,
            notifier,
            webhook_api_key: webhook_api_key.map(str::to_owned),
            dashboard,
        })
    }
}
