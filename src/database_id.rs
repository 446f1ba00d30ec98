//! Database ID type definition.

/// Alias for the integer type SQLite assigns to `INTEGER PRIMARY KEY` rows.
pub type DatabaseId = i64;
