//! Message templates: one formatted alert per decision, rendered once and
//! reused by every channel.

use std::collections::BTreeMap;

use crate::channels::ANDROID_CHANNEL_KEY;
use crate::models::{AlertDecision, SensorKind, Severity};

// ---

/// Channel-neutral rendering of an [`AlertDecision`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub title: String,
    pub body: String,
    /// Short line for the activity log.
    pub summary: String,
    pub icon: &'static str,
    /// Structured push payload.
    pub data: BTreeMap<String, String>,
}

impl AlertMessage {
    pub fn for_decision(decision: &AlertDecision) -> Self {
        // ---
        let value = decision.value;
        let range = decision.thresholds_snapshot;

        let (title, body, summary) = match (decision.kind, decision.severity) {
            (SensorKind::Ph, Severity::Low) => (
                "⚠️ pH too low".to_string(),
                format!(
                    "pH level is too low ({value:.1}). Normal range: {range}. \
                     Consider a partial water change."
                ),
                format!("pH too low ({value:.1})"),
            ),
            (SensorKind::Ph, Severity::High) => (
                "⚠️ pH too high".to_string(),
                format!(
                    "pH level is too high ({value:.1}). Normal range: {range}. \
                     Consider a partial water change."
                ),
                format!("pH too high ({value:.1})"),
            ),
            (SensorKind::WaterLevel, Severity::Critical) => (
                "🚨 Critical water level".to_string(),
                format!(
                    "Water level is critically low ({value:.0}%), below the {:.0}% minimum. \
                     Refill the aquarium immediately.",
                    range.min
                ),
                format!("Critical water level ({value:.0}%)"),
            ),
            (SensorKind::WaterLevel, Severity::Low) => (
                "💧 Low water level".to_string(),
                format!(
                    "Water level is low ({value:.0}%), below the {:.0}% advisory level. \
                     Top up the tank soon.",
                    range.min
                ),
                format!("Low water level ({value:.0}%)"),
            ),
            (SensorKind::WaterLevel, Severity::High) => (
                "💧 Water level too high".to_string(),
                format!(
                    "Water level is above the {:.0}% maximum ({value:.0}%). Check for overflow.",
                    range.max
                ),
                format!("Water level too high ({value:.0}%)"),
            ),
            (kind, Severity::Abnormal) => (
                format!("⚠️ Check {kind} thresholds"),
                format!(
                    "The {kind} range is set to {range}, so every reading counts as abnormal \
                     (current value {value:.1}). Review the thresholds in Settings."
                ),
                format!("{kind} thresholds inverted ({value:.1})"),
            ),
            // pH has no critical tier; `AlertDecision::validate` rejects it.
            (SensorKind::Ph, Severity::Critical) => (
                "⚠️ pH alert".to_string(),
                format!("pH reading {value:.1} is outside {range}."),
                format!("pH CRITICAL ({value:.1})"),
            ),
        };

        let (alert_type, android_channel, icon) = match decision.kind {
            SensorKind::Ph => ("ph_alert", "ph_alerts", "🧪"),
            SensorKind::WaterLevel => ("water_level_alert", "water_level_alerts", "💧"),
        };

        let data = BTreeMap::from([
            ("type".to_string(), alert_type.to_string()),
            ("kind".to_string(), decision.kind.path().to_string()),
            ("severity".to_string(), decision.severity.to_string()),
            ("value".to_string(), value.to_string()),
            ("min".to_string(), range.min.to_string()),
            ("max".to_string(), range.max.to_string()),
            (
                "timestamp".to_string(),
                decision.fired_at.timestamp_millis().to_string(),
            ),
            ("decisionId".to_string(), decision.id.to_string()),
            (ANDROID_CHANNEL_KEY.to_string(), android_channel.to_string()),
        ]);

        Self {
            title,
            body,
            summary,
            icon,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::ThresholdRange;
    use chrono::{TimeZone, Utc};

    fn decision(kind: SensorKind, severity: Severity, value: f64, min: f64, max: f64) -> AlertDecision {
        AlertDecision::new(
            kind,
            severity,
            value,
            ThresholdRange { min, max },
            Utc.with_ymd_and_hms(2025, 3, 18, 22, 15, 0).unwrap(),
        )
    }

    #[test]
    fn test_ph_low_template() {
        // ---
        let msg = AlertMessage::for_decision(&decision(SensorKind::Ph, Severity::Low, 6.1, 6.5, 8.5));
        assert!(msg.title.contains("pH too low"));
        assert!(msg.body.contains("6.1"));
        assert!(msg.body.contains("6.5-8.5"));
        assert_eq!(msg.data["type"], "ph_alert");
        assert_eq!(msg.data[ANDROID_CHANNEL_KEY], "ph_alerts");
    }

    #[test]
    fn test_ph_high_template() {
        // ---
        let msg = AlertMessage::for_decision(&decision(SensorKind::Ph, Severity::High, 8.7, 6.5, 8.5));
        assert!(msg.title.contains("pH too high"));
        assert!(msg.body.contains("8.7"));
        assert_eq!(msg.data["severity"], "HIGH");
        assert_eq!(msg.data["value"], "8.7");
    }

    #[test]
    fn test_water_templates() {
        // ---
        let critical =
            AlertMessage::for_decision(&decision(SensorKind::WaterLevel, Severity::Critical, 12.0, 20.0, 100.0));
        assert!(critical.title.contains("Critical water level"));
        assert!(critical.body.contains("12%"));
        assert_eq!(critical.data[ANDROID_CHANNEL_KEY], "water_level_alerts");

        let low = AlertMessage::for_decision(&decision(SensorKind::WaterLevel, Severity::Low, 55.0, 70.0, 100.0));
        assert!(low.title.contains("Low water level"));
        assert!(low.body.contains("below the 70% advisory level"), "body: {}", low.body);
        assert!(!low.body.contains("Normal range"));
        assert_eq!(low.summary, "Low water level (55%)");
        assert_eq!(low.icon, "💧");
    }

    #[test]
    fn test_abnormal_template_points_at_settings() {
        // ---
        let msg = AlertMessage::for_decision(&decision(SensorKind::Ph, Severity::Abnormal, 7.0, 8.0, 6.0));
        assert!(msg.title.contains("pH thresholds"));
        assert!(msg.body.contains("8-6"));
    }

    #[test]
    fn test_ph_critical_renders_without_a_water_template() {
        // ---
        let msg = AlertMessage::for_decision(&decision(SensorKind::Ph, Severity::Critical, 3.0, 6.5, 8.5));
        assert_eq!(msg.title, "⚠️ pH alert");
        assert!(!msg.body.contains("Water"));
        assert_eq!(msg.data["type"], "ph_alert");
    }

    #[test]
    fn test_timestamp_is_epoch_millis() {
        // ---
        let d = decision(SensorKind::Ph, Severity::High, 9.0, 6.5, 8.5);
        let msg = AlertMessage::for_decision(&d);
        assert_eq!(msg.data["timestamp"], d.fired_at.timestamp_millis().to_string());
        assert_eq!(msg.data["decisionId"], d.id.to_string());
    }
}
