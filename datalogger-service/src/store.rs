use datalogger_client::db;
use datalogger_client::domain::{DailySummary, NewReading, Reading};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};

/// Durable-write failure. Fatal to the commit attempt; the log itself is
/// never left with a partial row.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("query failure: {0}")]
    Query(#[from] anyhow::Error),
}

/// Append-only reading log plus its derived aggregates.
///
/// Commits serialize on an internal lock so id assignment matches commit
/// order; reads go straight to the pool and never wait on a writer.
pub struct Store {
    pool: SqlitePool,
    /// Running maximum of `energy_kwh` over all committed readings.
    energy_kwh: RwLock<f64>,
    /// Last assigned commit timestamp, used to keep `created_at`
    /// non-decreasing even if the wall clock steps backwards.
    last_commit_at: Mutex<OffsetDateTime>,
    sample_interval_secs: f64,
}

impl Store {
    /// Open the store on an existing pool: apply the schema and warm the
    /// energy cache from whatever the log already contains.
    pub async fn open(pool: SqlitePool, sample_interval_secs: f64) -> Result<Self, StoreError> {
        sqlx::query(db::CREATE_READING_TABLE).execute(&pool).await?;
        let energy = db::max_energy_kwh(&pool).await?;

        Ok(Self {
            pool,
            energy_kwh: RwLock::new(energy),
            last_commit_at: Mutex::new(OffsetDateTime::UNIX_EPOCH),
            sample_interval_secs,
        })
    }

    /// Append one reading, assigning its id and commit timestamp. Returns
    /// the full record exactly as persisted.
    pub async fn commit(&self, rec: &NewReading) -> Result<Reading, StoreError> {
        let mut last = self.last_commit_at.lock().await;

        let mut created_at = OffsetDateTime::now_utc();
        if created_at < *last {
            created_at = *last;
        }

        let result = sqlx::query(
            r#"
            INSERT INTO reading
                (v1, v2, v3, i1, i2, i3, p1, p2, p3, p_total, energy_kwh, temp, humidity, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rec.v1)
        .bind(rec.v2)
        .bind(rec.v3)
        .bind(rec.i1)
        .bind(rec.i2)
        .bind(rec.i3)
        .bind(rec.p1)
        .bind(rec.p2)
        .bind(rec.p3)
        .bind(rec.p_total)
        .bind(rec.energy_kwh)
        .bind(rec.temp)
        .bind(rec.humidity)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        *last = created_at;

        {
            let mut energy = self.energy_kwh.write().await;
            if rec.energy_kwh > *energy {
                *energy = rec.energy_kwh;
            }
        }

        Ok(Reading::from_new(result.last_insert_rowid(), created_at, rec))
    }

    /// The `limit` most recent readings, oldest first. Limits outside
    /// `0..=1000` are clamped.
    pub async fn recent(&self, limit: i64) -> Result<Vec<Reading>, StoreError> {
        Ok(db::recent_readings(&self.pool, limit).await?)
    }

    /// Monotonic energy-to-date: the highest `energy_kwh` ever committed,
    /// 0 for an empty log.
    pub async fn energy_to_date(&self) -> f64 {
        *self.energy_kwh.read().await
    }

    /// Per-day aggregates, newest day first, capped at 30 entries.
    pub async fn daily_summaries(&self, max_days: i64) -> Result<Vec<DailySummary>, StoreError> {
        Ok(db::daily_summaries(&self.pool, max_days, self.sample_interval_secs).await?)
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        Ok(db::count_readings(&self.pool).await?)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    pub(crate) async fn test_store() -> Store {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        Store::open(pool, 5.0).await.unwrap()
    }

    pub(crate) fn sample(p_total: f64, energy_kwh: f64) -> NewReading {
        NewReading {
            v1: 220.0,
            v2: 221.0,
            v3: 219.5,
            i1: 1.2,
            i2: 1.1,
            i3: 1.3,
            p1: 264.0,
            p2: 243.1,
            p3: 285.4,
            p_total,
            energy_kwh,
            temp: 24.5,
            humidity: 60.0,
        }
    }

    #[tokio::test]
    async fn ids_increase_and_timestamps_never_regress() {
        let store = test_store().await;

        let mut committed = Vec::new();
        for p in [100.0, 200.0, 300.0] {
            committed.push(store.commit(&sample(p, 0.0)).await.unwrap());
        }

        assert!(committed.windows(2).all(|w| w[0].id < w[1].id));
        assert!(committed
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn energy_to_date_is_running_maximum() {
        let store = test_store().await;
        assert_eq!(store.energy_to_date().await, 0.0);

        for kwh in [5.0, 3.0, 8.0, 2.0] {
            store.commit(&sample(1.0, kwh)).await.unwrap();
        }

        assert_eq!(store.energy_to_date().await, 8.0);
    }

    #[tokio::test]
    async fn energy_cache_warms_from_existing_log() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let store = Store::open(pool.clone(), 5.0).await.unwrap();
        store.commit(&sample(1.0, 42.0)).await.unwrap();
        drop(store);

        let reopened = Store::open(pool, 5.0).await.unwrap();
        assert_eq!(reopened.energy_to_date().await, 42.0);
    }

    #[tokio::test]
    async fn recent_window_matches_commit_order() {
        let store = test_store().await;
        for p in [1.0, 2.0, 3.0] {
            store.commit(&sample(p, 0.0)).await.unwrap();
        }

        let rows = store.recent(5).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].p_total, 1.0);
        assert_eq!(rows[2].p_total, 3.0);

        assert!(store.recent(0).await.unwrap().is_empty());
        assert!(store.recent(-1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn daily_summary_uses_configured_interval() {
        let store = test_store().await;
        for p in [1.0, 2.0, 3.0] {
            store.commit(&sample(p, 0.0)).await.unwrap();
        }

        let summaries = store.daily_summaries(30).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].peak_kva, 3.0);
        assert_eq!(summaries[0].count, 3);
        assert!((summaries[0].energy_kwh - 6.0 * 5.0 / 3600.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn committed_reading_round_trips_through_recent() {
        let store = test_store().await;
        let committed = store.commit(&sample(7.5, 1.0)).await.unwrap();

        let rows = store.recent(1).await.unwrap();
        assert_eq!(rows, vec![committed]);
    }
}
