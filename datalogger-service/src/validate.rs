use datalogger_client::domain::{Alert, AlertCode, NewReading};
use serde_json::{Map, Value};

/// Measurement fields a reading submission must carry. `energy_kwh` is the
/// one optional field and defaults to 0 when absent.
pub const REQUIRED_FIELDS: [&str; 12] = [
    "v1", "v2", "v3", "i1", "i2", "i3", "p1", "p2", "p3", "p_total", "temp", "humidity",
];

/// Rejected submission. Carries every field name that was missing or could
/// not be read as a finite number, so the producer can correct the payload
/// in one round trip.
#[derive(Debug, thiserror::Error)]
#[error("missing or invalid fields: {}", fields.join(", "))]
pub struct ValidationError {
    pub fields: Vec<String>,
}

/// Read a JSON value as a finite number. String-encoded numbers are accepted
/// because the sensor firmware sends some fields quoted.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn require(payload: &Map<String, Value>, name: &str, bad: &mut Vec<String>) -> f64 {
    match payload.get(name).and_then(numeric) {
        Some(v) => v,
        None => {
            bad.push(name.to_string());
            0.0
        }
    }
}

/// Check and normalize an inbound reading payload. Unknown extra keys are
/// ignored. No side effects; the caller decides what to do with the result.
pub fn validate_reading(payload: &Map<String, Value>) -> Result<NewReading, ValidationError> {
    let mut bad = Vec::new();

    let energy_kwh = match payload.get("energy_kwh") {
        None => 0.0,
        Some(v) => match numeric(v) {
            Some(x) => x,
            None => {
                bad.push("energy_kwh".to_string());
                0.0
            }
        },
    };

    let rec = NewReading {
        v1: require(payload, "v1", &mut bad),
        v2: require(payload, "v2", &mut bad),
        v3: require(payload, "v3", &mut bad),
        i1: require(payload, "i1", &mut bad),
        i2: require(payload, "i2", &mut bad),
        i3: require(payload, "i3", &mut bad),
        p1: require(payload, "p1", &mut bad),
        p2: require(payload, "p2", &mut bad),
        p3: require(payload, "p3", &mut bad),
        p_total: require(payload, "p_total", &mut bad),
        energy_kwh,
        temp: require(payload, "temp", &mut bad),
        humidity: require(payload, "humidity", &mut bad),
    };

    if bad.is_empty() {
        Ok(rec)
    } else {
        Err(ValidationError { fields: bad })
    }
}

/// Check an inbound alert payload: known code, non-empty phase, finite value.
pub fn validate_alert(payload: &Map<String, Value>) -> Result<Alert, ValidationError> {
    let mut bad = Vec::new();

    let code = payload
        .get("code")
        .and_then(|v| serde_json::from_value::<AlertCode>(v.clone()).ok());
    if code.is_none() {
        bad.push("code".to_string());
    }

    let phase = payload
        .get("phase")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());
    if phase.is_none() {
        bad.push("phase".to_string());
    }

    let value = payload.get("value").and_then(numeric);
    if value.is_none() {
        bad.push("value".to_string());
    }

    match (code, phase, value) {
        (Some(code), Some(phase), Some(value)) => Ok(Alert { code, phase, value }),
        _ => Err(ValidationError { fields: bad }),
    }
}
