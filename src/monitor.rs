//! Wires the policy engines, the latest thresholds, the recipient registry and
//! the dispatcher into one reading handler.
//!
//! Evaluations of one sensor kind are serialized behind a FIFO async mutex so
//! they run in arrival order; the lock is dropped before dispatching, so slow
//! channels never delay the next evaluation.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{watch, Mutex};

use crate::dispatch::{DispatchResult, Dispatcher, RecipientSet};
use crate::error::{AlertError, ChannelError};
use crate::models::{AlertDecision, SensorKind, SensorReading, ThresholdConfig};
use crate::policy::{PolicyEngine, DEFAULT_COOLDOWN};

// ---

/// Source of registered push tokens (the device-token registry).
#[async_trait]
pub trait RecipientSource: Send + Sync {
    async fn push_tokens(&self) -> Result<Vec<String>, ChannelError>;
}

/// Fixed token list, for embedding hosts that manage tokens themselves.
#[async_trait]
impl RecipientSource for Vec<String> {
    async fn push_tokens(&self) -> Result<Vec<String>, ChannelError> {
        Ok(self.clone())
    }
}

/// A fired decision together with its delivery report.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub decision: AlertDecision,
    pub dispatch: DispatchResult,
}

pub struct Monitor {
    ph: Mutex<PolicyEngine>,
    water_level: Mutex<PolicyEngine>,
    thresholds: watch::Receiver<ThresholdConfig>,
    recipients: Arc<dyn RecipientSource>,
    dispatcher: Dispatcher,
    cooldown: Duration,
}

impl Monitor {
    pub fn new(
        dispatcher: Dispatcher,
        thresholds: watch::Receiver<ThresholdConfig>,
        recipients: Arc<dyn RecipientSource>,
    ) -> Self {
        Self::with_cooldown(dispatcher, thresholds, recipients, DEFAULT_COOLDOWN)
    }

    pub fn with_cooldown(
        dispatcher: Dispatcher,
        thresholds: watch::Receiver<ThresholdConfig>,
        recipients: Arc<dyn RecipientSource>,
        cooldown: Duration,
    ) -> Self {
        Self {
            ph: Mutex::new(PolicyEngine::with_cooldown(SensorKind::Ph, cooldown)),
            water_level: Mutex::new(PolicyEngine::with_cooldown(SensorKind::WaterLevel, cooldown)),
            thresholds,
            recipients,
            dispatcher,
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn engine(&self, kind: SensorKind) -> &Mutex<PolicyEngine> {
        match kind {
            SensorKind::Ph => &self.ph,
            SensorKind::WaterLevel => &self.water_level,
        }
    }

    /// Latest thresholds as published by the settings path.
    pub fn thresholds(&self) -> ThresholdConfig {
        self.thresholds.borrow().clone()
    }

    /// Evaluate `reading` and, if it fires, dispatch the decision.
    pub async fn handle(&self, reading: SensorReading) -> Result<Option<Alert>, AlertError> {
        // ---
        let (decision, thresholds) = {
            let mut engine = self.engine(reading.kind).lock().await;
            let thresholds = self.thresholds();
            (engine.evaluate(&reading, &thresholds)?, thresholds)
        };

        let Some(decision) = decision else {
            return Ok(None);
        };

        let tokens = match self.recipients.push_tokens().await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::error!("Failed to load push tokens, dispatching without push: {}", e);
                Vec::new()
            }
        };
        let recipients = RecipientSet::from_config(tokens, &thresholds);

        let dispatch = self.dispatcher.dispatch(&decision, &thresholds, &recipients).await?;
        Ok(Some(Alert { decision, dispatch }))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::channels::ActivityLog;
    use chrono::{DateTime, TimeZone, Utc};

    struct NullLog;

    #[async_trait]
    impl ActivityLog for NullLog {
        async fn append(&self, _at: DateTime<Utc>, _icon: &str, _message: &str) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn monitor(cooldown: Duration) -> (Arc<Monitor>, watch::Sender<ThresholdConfig>) {
        let (tx, rx) = watch::channel(ThresholdConfig::default());
        let dispatcher = Dispatcher::new(Arc::new(NullLog));
        let monitor = Monitor::with_cooldown(dispatcher, rx, Arc::new(Vec::<String>::new()), cooldown);
        (Arc::new(monitor), tx)
    }

    fn ph_at(value: f64, secs: i64) -> SensorReading {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 19, 6, 0, 0).unwrap();
        SensorReading::new(SensorKind::Ph, value, t0 + chrono::Duration::seconds(secs))
    }

    #[tokio::test]
    async fn test_queued_readings_evaluate_in_arrival_order() {
        // ---
        let (monitor, _tx) = monitor(Duration::ZERO);

        // Hold the pH engine so every handle call queues behind it.
        let guard = monitor.ph.lock().await;
        let mut handles = Vec::new();
        for (secs, value) in [(0, 9.0), (1, 7.0), (2, 9.0), (3, 7.0), (4, 9.0)] {
            let monitor = monitor.clone();
            handles.push(tokio::spawn(async move { monitor.handle(ph_at(value, secs)).await }));
            // Let the task reach the lock before the next one is issued.
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
        }
        drop(guard);

        let mut fired = Vec::new();
        for handle in handles {
            if let Some(alert) = handle.await.unwrap().unwrap() {
                fired.push(alert.decision.fired_at);
            }
        }

        // Any other order of these values loses at least one edge.
        assert_eq!(fired, vec![ph_at(9.0, 0).observed_at, ph_at(9.0, 2).observed_at, ph_at(9.0, 4).observed_at]);
    }

    #[tokio::test]
    async fn test_threshold_snapshot_is_taken_under_the_engine_lock() {
        // ---
        let (monitor, tx) = monitor(Duration::ZERO);

        let guard = monitor.ph.lock().await;
        let pending = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.handle(ph_at(8.0, 0)).await }
        });
        tokio::task::yield_now().await;

        // Published while the reading waits for the engine.
        tx.send_modify(|cfg| cfg.max_ph = 7.5);
        drop(guard);

        let alert = pending.await.unwrap().unwrap().expect("8.0 is above the edited maximum");
        assert_eq!(alert.decision.thresholds_snapshot.max, 7.5);
    }
}
