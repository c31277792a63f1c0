//! Schema for `logs.duckdb`, embedded with `include_str!`
//!
//! `000_migrations.sql` bootstraps the bookkeeping table and is applied
//! first; the rest run in name order and are recorded once applied.
//! New files must be appended here, keeping the `NNN_` prefix ascending.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
    ("002_event_index.sql", include_str!("002_event_index.sql")),
];
