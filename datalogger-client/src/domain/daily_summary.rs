use serde::Serialize;
use time::Date;

/// Per-calendar-day aggregate, computed on demand from committed readings.
///
/// `energy_kwh` is estimated as `sum(p_total) * interval_secs / 3600`, which
/// assumes the producer samples at a fixed interval. Irregular submission
/// cadence biases the estimate; this is a documented limitation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub day: Date,
    pub peak_kva: f64,
    pub count: i64,
    pub energy_kwh: f64,
}
