//! The monthly reset of members' `postsThisMonth` counters.
//!
//! Months are counted in the dashboard's fixed UTC+7 offset, so a reset
//! happens at midnight on the first of the month in that offset.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::{Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::{
    Error,
    member::reset_monthly_posts,
    notify::{ChangeNotifier, ChangedRow, RowChangeEvent},
    timezone::DASHBOARD_OFFSET,
};

/// Initialize the table that remembers when the counters were last reset.
pub fn create_reset_state_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS reset_state (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            last_reset TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

/// Decide whether the monthly counters are due for a reset.
///
/// Returns `false` when there is no previous reset. Otherwise returns `true`
/// if `last_reset` and `now` fall in a different calendar month or year once
/// both are shifted into [DASHBOARD_OFFSET].
pub fn should_reset_monthly_counters(
    last_reset: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> bool {
    let Some(last_reset) = last_reset else {
        return false;
    };

    let last_reset = last_reset.to_offset(DASHBOARD_OFFSET);
    let now = now.to_offset(DASHBOARD_OFFSET);

    last_reset.month() != now.month() || last_reset.year() != now.year()
}

/// Check the stored reset timestamp against `now`.
///
/// The first check on a fresh database records `now` and returns `false`.
pub fn check_month_reset(connection: &Connection, now: OffsetDateTime) -> Result<bool, Error> {
    let last_reset = get_last_reset(connection)?;

    if last_reset.is_none() {
        set_last_reset(now, connection)?;
    }

    Ok(should_reset_monthly_counters(last_reset, now))
}

/// Reset every member's `postsThisMonth` to zero if a new month has started.
///
/// On reset, `now` becomes the last reset time and an update event is
/// published for every member. Returns the number of members that were reset.
pub fn reset_monthly_counters_if_due(
    connection: &mut Connection,
    notifier: &ChangeNotifier,
    now: OffsetDateTime,
) -> Result<usize, Error> {
    let transaction = connection.transaction()?;

    if !check_month_reset(&transaction, now)? {
        transaction.commit()?;
        return Ok(0);
    }

    let members = reset_monthly_posts(&transaction)?;
    set_last_reset(now, &transaction)?;
    transaction.commit()?;

    tracing::info!("Reset monthly post counts for {} members", members.len());

    let count = members.len();
    for member in members {
        notifier.publish(RowChangeEvent::update(ChangedRow::Member(member)));
    }

    Ok(count)
}

/// Run [reset_monthly_counters_if_due] every `period` until the task is aborted.
///
/// Errors are logged and the next check is attempted on schedule.
pub async fn run_monthly_reset_task(
    db_connection: Arc<Mutex<Connection>>,
    notifier: ChangeNotifier,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;

        let result = match db_connection.lock() {
            Ok(mut connection) => {
                reset_monthly_counters_if_due(&mut connection, &notifier, OffsetDateTime::now_utc())
            }
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                Err(Error::DatabaseLockError)
            }
        };

        if let Err(error) = result {
            tracing::error!("Could not run the monthly reset check: {error}");
        }
    }
}

fn get_last_reset(connection: &Connection) -> Result<Option<OffsetDateTime>, Error> {
    connection
        .query_row("SELECT last_reset FROM reset_state WHERE id = 1", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(Error::from)
}

fn set_last_reset(last_reset: OffsetDateTime, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO reset_state (id, last_reset) VALUES (1, ?1)
        ON CONFLICT(id) DO UPDATE SET last_reset = excluded.last_reset",
        (last_reset,),
    )?;

    Ok(())
}
