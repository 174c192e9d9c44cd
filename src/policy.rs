//! Alert policy engine: classification, edge-triggering and cooldown.
//!
//! One [`PolicyEngine`] exists per monitored sensor kind. It turns a stream of
//! [`SensorReading`]s into [`AlertDecision`]s and owns the only copy of its
//! evaluation memory (`EngineState`).
//!
//! # State machine
//!
//! ```text
//!            abnormal (cooldown satisfied)  -> fire
//!            abnormal (inside cooldown)     -> suppress
//!   NORMAL ─────────────────────────────────────────► ABNORMAL
//!     ▲  │                                              │  │
//!     │  └── normal: no-op            abnormal: no-op ──┘  │
//!     └──────────────────── normal: silent reset ──────────┘
//! ```
//!
//! A transition suppressed by cooldown still moves the engine to ABNORMAL, so
//! a condition that persists past the cooldown window does not fire late.
//! Only a fresh NORMAL -> ABNORMAL edge after the window fires again.
//!
//! # Clock injection
//! Time is taken from `reading.observed_at`, never from the wall clock, so
//! evaluation is deterministic in tests.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::AlertError;
use crate::models::{AlertDecision, SensorKind, SensorReading, Severity, ThresholdConfig, ThresholdRange};

// ---

/// Minimum spacing between two alerts of the same kind.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(3 * 60);

/// Private evaluation memory of one engine.
#[derive(Debug, Clone, Default, PartialEq)]
struct EngineState {
    last_value: Option<f64>,
    was_abnormal: bool,
    last_notification_at: Option<DateTime<Utc>>,
}

/// Classify `value` for `kind` against `thresholds`.
///
/// Returns `None` when the value is inside the normal range. A range whose
/// minimum is not strictly below its maximum (including NaN bounds) has no
/// normal values and yields [`Severity::Abnormal`].
pub fn classify(kind: SensorKind, value: f64, thresholds: &ThresholdConfig) -> Option<Severity> {
    // ---
    let range = thresholds.range_for(kind);
    if !range.is_well_formed() {
        return Some(Severity::Abnormal);
    }

    match kind {
        SensorKind::Ph => {
            if value < range.min {
                Some(Severity::Low)
            } else if value > range.max {
                Some(Severity::High)
            } else {
                None
            }
        }
        SensorKind::WaterLevel => {
            if value < range.min {
                Some(Severity::Critical)
            } else if value < thresholds.low_water_level() {
                Some(Severity::Low)
            } else if value > range.max {
                Some(Severity::High)
            } else {
                None
            }
        }
    }
}

/// The boundary pair a reading of `severity` left.
///
/// Water LOW sits inside the configured range, so its snapshot runs from the
/// advisory level instead of the critical floor.
fn crossed_range(kind: SensorKind, severity: Severity, thresholds: &ThresholdConfig) -> ThresholdRange {
    // ---
    let range = thresholds.range_for(kind);
    match (kind, severity) {
        (SensorKind::WaterLevel, Severity::Low) => ThresholdRange {
            min: thresholds.low_water_level(),
            max: range.max,
        },
        _ => range,
    }
}

/// Edge-triggered, cooldown-gated alert policy for one sensor kind.
#[derive(Debug)]
pub struct PolicyEngine {
    kind: SensorKind,
    cooldown: Duration,
    state: EngineState,
}

impl PolicyEngine {
    pub fn new(kind: SensorKind) -> Self {
        Self::with_cooldown(kind, DEFAULT_COOLDOWN)
    }

    pub fn with_cooldown(kind: SensorKind, cooldown: Duration) -> Self {
        Self {
            kind,
            cooldown,
            state: EngineState::default(),
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Evaluate one reading against the current thresholds.
    ///
    /// Returns `Ok(Some(decision))` only on a NORMAL -> ABNORMAL edge with the
    /// cooldown window elapsed. Fails with [`AlertError::InvalidReading`] for
    /// non-finite values or readings of another kind, leaving state untouched.
    pub fn evaluate(
        &mut self,
        reading: &SensorReading,
        thresholds: &ThresholdConfig,
    ) -> Result<Option<AlertDecision>, AlertError> {
        // ---
        if reading.kind != self.kind {
            return Err(AlertError::InvalidReading {
                kind: self.kind,
                reason: format!("{} reading routed to the {} engine", reading.kind, self.kind),
            });
        }
        if !reading.value.is_finite() {
            return Err(AlertError::InvalidReading {
                kind: self.kind,
                reason: format!("non-finite value {}", reading.value),
            });
        }

        let range = thresholds.range_for(self.kind);
        let severity = classify(self.kind, reading.value, thresholds);
        if severity == Some(Severity::Abnormal) {
            tracing::warn!(
                kind = %self.kind,
                range = %range,
                "Threshold range is inverted; treating every reading as abnormal"
            );
        }

        let was_abnormal = self.state.was_abnormal;
        self.state.last_value = Some(reading.value);
        self.state.was_abnormal = severity.is_some();

        let Some(severity) = severity else {
            if was_abnormal {
                tracing::info!(kind = %self.kind, value = reading.value, "Reading back within {}", range);
            }
            return Ok(None);
        };

        if was_abnormal {
            tracing::trace!(kind = %self.kind, value = reading.value, "Still abnormal, no new edge");
            return Ok(None);
        }

        if !self.cooldown_elapsed(reading.observed_at) {
            tracing::debug!(
                kind = %self.kind,
                value = reading.value,
                %severity,
                last_notification_at = ?self.state.last_notification_at,
                "Abnormal edge suppressed by cooldown"
            );
            return Ok(None);
        }

        self.state.last_notification_at = Some(reading.observed_at);
        let crossed = crossed_range(self.kind, severity, thresholds);
        let decision = AlertDecision::new(self.kind, severity, reading.value, crossed, reading.observed_at);
        tracing::info!(
            kind = %self.kind,
            value = reading.value,
            %severity,
            decision_id = %decision.id,
            "Alert fired, value outside {}",
            crossed
        );
        Ok(Some(decision))
    }

    /// `true` when no alert has fired yet, or `now` is at least one cooldown
    /// window away from the last one. The distance is absolute, so an alert
    /// stamped far in the future by a skewed sensor clock does not hold back
    /// edges observed at real times.
    fn cooldown_elapsed(&self, now: DateTime<Utc>) -> bool {
        // ---
        match self.state.last_notification_at {
            None => true,
            Some(last) => match (now - last).abs().to_std() {
                Ok(distance) => distance >= self.cooldown,
                Err(_) => true,
            },
        }
    }
}
