use anyhow::Result;
use sqlx::SqlitePool;
use time::{macros::format_description, Date};

use crate::domain::{DailySummary, Reading};

/// Hard cap on a recent-window request, regardless of what the caller asks for.
pub const MAX_RECENT: i64 = 1000;

/// Hard cap on the number of daily summary rows returned.
pub const MAX_SUMMARY_DAYS: i64 = 30;

/// Fetch the `limit` most recently committed readings, oldest first.
///
/// `limit` is clamped to `0..=MAX_RECENT`; zero or negative values yield an
/// empty result rather than an error.
pub async fn recent_readings(pool: &SqlitePool, limit: i64) -> Result<Vec<Reading>> {
    let limit = limit.clamp(0, MAX_RECENT);
    if limit == 0 {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, Reading>(
        r#"
        SELECT
            id,
            v1, v2, v3,
            i1, i2, i3,
            p1, p2, p3,
            p_total,
            energy_kwh,
            temp,
            humidity,
            created_at
        FROM (
            SELECT * FROM reading ORDER BY id DESC LIMIT ?
        )
        ORDER BY id ASC
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Maximum cumulative energy value ever committed, or 0 for an empty log.
pub async fn max_energy_kwh(pool: &SqlitePool) -> Result<f64> {
    let row: (Option<f64>,) = sqlx::query_as("SELECT MAX(energy_kwh) FROM reading")
        .fetch_one(pool)
        .await?;

    Ok(row.0.unwrap_or(0.0))
}

/// Total number of committed readings.
pub async fn count_readings(pool: &SqlitePool) -> Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reading")
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}

/// Aggregate readings by calendar day, newest day first.
///
/// The per-day energy estimate multiplies the summed apparent power by the
/// configured sample interval; see `DailySummary` for the caveat on
/// irregular cadence.
pub async fn daily_summaries(
    pool: &SqlitePool,
    max_days: i64,
    interval_secs: f64,
) -> Result<Vec<DailySummary>> {
    let max_days = max_days.clamp(0, MAX_SUMMARY_DAYS);
    if max_days == 0 {
        return Ok(Vec::new());
    }

    let rows: Vec<(String, f64, i64, f64)> = sqlx::query_as(
        r#"
        SELECT
            date(created_at) AS day,
            MAX(p_total),
            COUNT(*),
            SUM(p_total)
        FROM reading
        GROUP BY date(created_at)
        ORDER BY day DESC
        LIMIT ?
        "#,
    )
    .bind(max_days)
    .fetch_all(pool)
    .await?;

    let mut summaries = Vec::with_capacity(rows.len());
    for (day, peak_kva, count, sum_p_total) in rows {
        let day = Date::parse(&day, format_description!("[year]-[month]-[day]"))?;
        summaries.push(DailySummary {
            day,
            peak_kva,
            count,
            energy_kwh: sum_p_total * interval_secs / 3600.0,
        });
    }

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use time::OffsetDateTime;

    async fn test_pool() -> SqlitePool {
        // A shared in-memory database needs a single connection: every new
        // `:memory:` connection would otherwise see an empty schema.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(crate::db::CREATE_READING_TABLE)
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    async fn insert(pool: &SqlitePool, p_total: f64, energy_kwh: f64) {
        sqlx::query(
            r#"
            INSERT INTO reading
                (v1, v2, v3, i1, i2, i3, p1, p2, p3, p_total, energy_kwh, temp, humidity, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(220.0)
        .bind(221.0)
        .bind(219.0)
        .bind(1.0)
        .bind(1.1)
        .bind(0.9)
        .bind(220.0)
        .bind(243.1)
        .bind(197.1)
        .bind(p_total)
        .bind(energy_kwh)
        .bind(24.5)
        .bind(60.0)
        .bind(OffsetDateTime::now_utc())
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn recent_returns_oldest_first() {
        let pool = test_pool().await;
        for p in [1.0, 2.0, 3.0] {
            insert(&pool, p, 0.0).await;
        }

        let rows = recent_readings(&pool, 5).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(rows[0].p_total, 1.0);
        assert_eq!(rows[2].p_total, 3.0);
    }

    #[tokio::test]
    async fn recent_clamps_non_positive_limits_to_empty() {
        let pool = test_pool().await;
        insert(&pool, 1.0, 0.0).await;

        assert!(recent_readings(&pool, 0).await.unwrap().is_empty());
        assert!(recent_readings(&pool, -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn max_energy_is_zero_on_empty_log() {
        let pool = test_pool().await;
        assert_eq!(max_energy_kwh(&pool).await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn daily_summary_estimates_energy_from_interval() {
        let pool = test_pool().await;
        for p in [1.0, 2.0, 3.0] {
            insert(&pool, p, 0.0).await;
        }

        let summaries = daily_summaries(&pool, 30, 5.0).await.unwrap();
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.count, 3);
        assert_eq!(s.peak_kva, 3.0);
        assert!((s.energy_kwh - 6.0 * 5.0 / 3600.0).abs() < 1e-9);
    }
}
