use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One committed telemetry record. `id` and `created_at` are assigned by the
/// store at commit time and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    pub id: i64,
    pub v1: f64,
    pub v2: f64,
    pub v3: f64,
    pub i1: f64,
    pub i2: f64,
    pub i3: f64,
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
    pub p_total: f64,
    pub energy_kwh: f64,
    pub temp: f64,
    pub humidity: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A validated reading that has not been committed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub v1: f64,
    pub v2: f64,
    pub v3: f64,
    pub i1: f64,
    pub i2: f64,
    pub i3: f64,
    pub p1: f64,
    pub p2: f64,
    pub p3: f64,
    pub p_total: f64,
    pub energy_kwh: f64,
    pub temp: f64,
    pub humidity: f64,
}

impl Reading {
    pub fn from_new(id: i64, created_at: OffsetDateTime, rec: &NewReading) -> Self {
        Self {
            id,
            v1: rec.v1,
            v2: rec.v2,
            v3: rec.v3,
            i1: rec.i1,
            i2: rec.i2,
            i3: rec.i3,
            p1: rec.p1,
            p2: rec.p2,
            p3: rec.p3,
            p_total: rec.p_total,
            energy_kwh: rec.energy_kwh,
            temp: rec.temp,
            humidity: rec.humidity,
            created_at,
        }
    }
}
