//! Data models shared by the policy engine, the dispatcher and the host
//! service.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AlertError;

// ---

/// pH bounds used when the store has never been configured.
pub const DEFAULT_MIN_PH: f64 = 6.5;
pub const DEFAULT_MAX_PH: f64 = 8.5;

/// Water level (percent) below which the tank is critically low.
pub const DEFAULT_MIN_WATER_LEVEL: f64 = 20.0;
pub const DEFAULT_MAX_WATER_LEVEL: f64 = 100.0;

/// Legacy "Low" advisory boundary, used when `lowWaterLevel` is not configured.
pub const LEGACY_LOW_WATER_LEVEL: f64 = 70.0;

/// The sensors the engine knows how to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorKind {
    Ph,
    WaterLevel,
}

impl SensorKind {
    pub const ALL: [SensorKind; 2] = [SensorKind::Ph, SensorKind::WaterLevel];

    /// Path of this sensor in the reading store.
    pub fn path(self) -> &'static str {
        match self {
            SensorKind::Ph => "ph",
            SensorKind::WaterLevel => "water_level",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Ph => f.write_str("pH"),
            SensorKind::WaterLevel => f.write_str("water level"),
        }
    }
}

impl FromStr for SensorKind {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "ph" => Ok(SensorKind::Ph),
            "water_level" | "waterlevel" => Ok(SensorKind::WaterLevel),
            _ => Err(AlertError::UnknownKind(s.to_string())),
        }
    }
}

/// One observation from the reading store. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub kind: SensorKind,
    pub value: f64,
    pub observed_at: DateTime<Utc>,
}

impl SensorReading {
    pub fn new(kind: SensorKind, value: f64, observed_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            value,
            observed_at,
        }
    }
}

/// Change notification as delivered by the reading store webhook.
///
/// `value` is null when the sensor disconnects; `observed_at` is filled in
/// with the receive time when the store omits it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReadingEvent {
    pub value: Option<f64>,
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
}

impl RawReadingEvent {
    /// Returns `None` for a disconnect (null value).
    pub fn to_reading(&self, kind: SensorKind, received_at: DateTime<Utc>) -> Option<SensorReading> {
        // ---
        self.value
            .map(|value| SensorReading::new(kind, value, self.observed_at.unwrap_or(received_at)))
    }
}

/// Inclusive normal range for one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRange {
    pub min: f64,
    pub max: f64,
}

impl ThresholdRange {
    /// `false` for inverted, empty or NaN bounds.
    pub fn is_well_formed(&self) -> bool {
        self.min < self.max
    }
}

impl fmt::Display for ThresholdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// User-editable thresholds and notification preferences.
///
/// Field names follow the store's `thresholds` object; the mobile app's
/// `pushAlerts` / `emailAlerts` spellings are accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase", default)]
pub struct ThresholdConfig {
    pub min_ph: f64,
    pub max_ph: f64,
    pub min_water_level: f64,
    pub max_water_level: f64,
    /// Upper bound of the "Low" advisory tier for water level.
    pub low_water_level: Option<f64>,
    #[serde(alias = "pushAlerts")]
    pub push_enabled: bool,
    #[serde(alias = "emailAlerts")]
    pub email_enabled: bool,
    pub email_address: Option<String>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_ph: DEFAULT_MIN_PH,
            max_ph: DEFAULT_MAX_PH,
            min_water_level: DEFAULT_MIN_WATER_LEVEL,
            max_water_level: DEFAULT_MAX_WATER_LEVEL,
            low_water_level: None,
            push_enabled: true,
            email_enabled: false,
            email_address: None,
        }
    }
}

impl ThresholdConfig {
    /// Normal range for `kind`.
    pub fn range_for(&self, kind: SensorKind) -> ThresholdRange {
        match kind {
            SensorKind::Ph => ThresholdRange {
                min: self.min_ph,
                max: self.max_ph,
            },
            SensorKind::WaterLevel => ThresholdRange {
                min: self.min_water_level,
                max: self.max_water_level,
            },
        }
    }

    /// Advisory "Low" boundary for water level, falling back to the legacy 70%.
    pub fn low_water_level(&self) -> f64 {
        self.low_water_level.unwrap_or(LEGACY_LOW_WATER_LEVEL)
    }

    /// Edit-boundary validation. The engine never calls this.
    pub fn validate(&self) -> Result<(), AlertError> {
        // ---
        for kind in SensorKind::ALL {
            let range = self.range_for(kind);
            if !range.min.is_finite() || !range.max.is_finite() {
                return Err(AlertError::InvalidThresholdConfig(format!(
                    "{kind} bounds must be finite numbers"
                )));
            }
            if !range.is_well_formed() {
                return Err(AlertError::InvalidThresholdConfig(format!(
                    "{kind} minimum ({}) must be below maximum ({})",
                    range.min, range.max
                )));
            }
        }

        if let Some(low) = self.low_water_level {
            if !low.is_finite() || low < self.min_water_level || low > self.max_water_level {
                return Err(AlertError::InvalidThresholdConfig(format!(
                    "low water level ({low}) must lie within {}",
                    self.range_for(SensorKind::WaterLevel)
                )));
            }
        }

        if let Some(address) = &self.email_address {
            if !is_plausible_email(address) {
                return Err(AlertError::InvalidThresholdConfig(format!(
                    "email address {address:?} is not valid"
                )));
            }
        }

        Ok(())
    }
}

/// Minimal shape check; the relay does real validation.
pub fn is_plausible_email(address: &str) -> bool {
    let address = address.trim();
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

/// How far outside the normal range a reading is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    High,
    Critical,
    /// The configured range is inverted or empty, so no value is normal.
    Abnormal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "LOW",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
            Severity::Abnormal => "ABNORMAL",
        };
        f.write_str(s)
    }
}

/// Output of the policy engine when it decides to alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDecision {
    pub id: Uuid,
    pub kind: SensorKind,
    pub severity: Severity,
    pub value: f64,
    pub thresholds_snapshot: ThresholdRange,
    pub fired_at: DateTime<Utc>,
}

impl AlertDecision {
    pub fn new(
        kind: SensorKind,
        severity: Severity,
        value: f64,
        thresholds_snapshot: ThresholdRange,
        fired_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            value,
            thresholds_snapshot,
            fired_at,
        }
    }

    /// Rejects decisions the policy engine could never have produced.
    pub fn validate(&self) -> Result<(), AlertError> {
        // ---
        let malformed = |reason: String| AlertError::MalformedDecision {
            id: self.id,
            reason,
        };

        if !self.value.is_finite() {
            return Err(malformed(format!("non-finite value {}", self.value)));
        }
        if self.kind == SensorKind::Ph && self.severity == Severity::Critical {
            return Err(malformed("pH alerts have no CRITICAL tier".to_string()));
        }
        Ok(())
    }
}
