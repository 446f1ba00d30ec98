//! Database initialization for the application's SQLite store.

use rusqlite::Connection;

use crate::{
    Error, ledger::create_ledger_table, member::create_member_table,
    reset::create_reset_state_table,
};

/// Create the tables for the domain models if they do not already exist.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    create_member_table(connection)?;
    create_ledger_table(connection)?;
    create_reset_state_table(connection)?;

    Ok(())
}

#[cfg(test)]
mod initialize_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn sql_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        assert_eq!(Ok(()), initialize(&connection));
    }

    #[test]
    fn can_initialize_twice() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");
        initialize(&connection).expect("first initialization failed");

        assert_eq!(Ok(()), initialize(&connection));
    }
}
