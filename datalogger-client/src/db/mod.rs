pub mod reading_queries;

pub use reading_queries::{
    count_readings, daily_summaries, max_energy_kwh, recent_readings, MAX_RECENT,
    MAX_SUMMARY_DAYS,
};

/// DDL for the append-only reading log. Applied with
/// `CREATE TABLE IF NOT EXISTS` so startup is idempotent.
pub const CREATE_READING_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS reading (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    v1         REAL NOT NULL,
    v2         REAL NOT NULL,
    v3         REAL NOT NULL,
    i1         REAL NOT NULL,
    i2         REAL NOT NULL,
    i3         REAL NOT NULL,
    p1         REAL NOT NULL,
    p2         REAL NOT NULL,
    p3         REAL NOT NULL,
    p_total    REAL NOT NULL,
    energy_kwh REAL NOT NULL DEFAULT 0,
    temp       REAL NOT NULL,
    humidity   REAL NOT NULL,
    created_at TEXT NOT NULL
)
"#;
