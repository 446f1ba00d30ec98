//! The fixed UTC offset the dashboard uses for calendar decisions and the
//! gateway's date format.

use time::{
    OffsetDateTime, UtcOffset,
    format_description::BorrowedFormatItem,
    macros::{format_description, offset},
};

/// The dashboard's local time, UTC+7. Month boundaries and default
/// transaction dates are computed in this offset.
pub const DASHBOARD_OFFSET: UtcOffset = offset!(+7);

/// The date-time layout the payment gateway uses, e.g. `2025-03-25 14:02:37`.
pub const GATEWAY_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Format `date_time` in the gateway's layout after shifting it into [DASHBOARD_OFFSET].
pub fn format_gateway_date(date_time: OffsetDateTime) -> Result<String, time::error::Format> {
    date_time.to_offset(DASHBOARD_OFFSET).format(GATEWAY_DATE_FORMAT)
}

#[cfg(test)]
mod format_gateway_date_tests {
    use time::macros::datetime;

    use super::format_gateway_date;

    #[test]
    fn shifts_into_dashboard_offset() {
        let formatted = format_gateway_date(datetime!(2025-01-31 20:30:05 UTC)).unwrap();

        assert_eq!(formatted, "2025-02-01 03:30:05");
    }
}
