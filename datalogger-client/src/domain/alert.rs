use serde::{Deserialize, Serialize};

/// Condition codes the sensor firmware raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertCode {
    Overcurrent,
    Undervoltage,
    Overvoltage,
    Imbalance,
}

/// Transient condition event. Broadcast to live observers only; never
/// persisted and never part of a history snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub code: AlertCode,
    pub phase: String,
    pub value: f64,
}
