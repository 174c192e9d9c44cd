//! End-to-end: readings through the monitor, with in-memory channels.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::watch;

use smartaqua_alerts::channels::{ActivityLog, EmailChannel, PushChannel};
use smartaqua_alerts::dispatch::{Channel, DeliveryStatus};
use smartaqua_alerts::{
    AlertError, ChannelError, Dispatcher, Monitor, RecipientSource, SensorKind, SensorReading, Severity,
    ThresholdConfig,
};

// ---

#[derive(Default)]
struct Outbox {
    push: Mutex<Vec<(String, String, BTreeMap<String, String>)>>,
    email: Mutex<Vec<(String, String)>>,
    log: Mutex<Vec<String>>,
}

struct Push(Arc<Outbox>, bool);
struct Email(Arc<Outbox>);
struct Log(Arc<Outbox>);

#[async_trait]
impl PushChannel for Push {
    async fn deliver(
        &self,
        token: &str,
        title: &str,
        _body: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<(), ChannelError> {
        if self.1 {
            return Err(ChannelError::Rejected {
                status: 400,
                message: "DeviceNotRegistered".to_string(),
            });
        }
        self.0
            .push
            .lock()
            .unwrap()
            .push((token.to_string(), title.to_string(), data.clone()));
        Ok(())
    }
}

#[async_trait]
impl EmailChannel for Email {
    async fn deliver(&self, address: &str, subject: &str, _body: &str) -> Result<(), ChannelError> {
        self.0
            .email
            .lock()
            .unwrap()
            .push((address.to_string(), subject.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ActivityLog for Log {
    async fn append(&self, _at: DateTime<Utc>, icon: &str, message: &str) -> Result<(), ChannelError> {
        self.0.log.lock().unwrap().push(format!("{icon} {message}"));
        Ok(())
    }
}

struct BrokenRegistry;

#[async_trait]
impl RecipientSource for BrokenRegistry {
    async fn push_tokens(&self) -> Result<Vec<String>, ChannelError> {
        Err(ChannelError::Storage("connection refused".to_string()))
    }
}

fn t(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 19, 6, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

fn settings() -> ThresholdConfig {
    ThresholdConfig {
        min_ph: 6.5,
        max_ph: 8.5,
        push_enabled: true,
        email_enabled: true,
        email_address: Some("keeper@aquarium.io".to_string()),
        ..Default::default()
    }
}

fn monitor_with(
    outbox: &Arc<Outbox>,
    failing_push: bool,
    recipients: Arc<dyn RecipientSource>,
) -> (Monitor, watch::Sender<ThresholdConfig>) {
    let dispatcher = Dispatcher::new(Arc::new(Log(outbox.clone())))
        .with_push(Arc::new(Push(outbox.clone(), failing_push)))
        .with_email(Arc::new(Email(outbox.clone())));
    let (tx, rx) = watch::channel(settings());
    (Monitor::new(dispatcher, rx, recipients), tx)
}

fn tokens(list: &[&str]) -> Arc<dyn RecipientSource> {
    Arc::new(list.iter().map(|s| s.to_string()).collect::<Vec<_>>())
}

#[tokio::test]
async fn ph_excursion_reaches_every_channel_once() {
    // ---
    let outbox = Arc::new(Outbox::default());
    let (monitor, _tx) = monitor_with(&outbox, false, tokens(&["tok-phone", "tok-tablet"]));

    let mut alerts = Vec::new();
    for (i, value) in [7.0, 7.2, 8.7, 8.8, 7.1].into_iter().enumerate() {
        let reading = SensorReading::new(SensorKind::Ph, value, t(i as i64 * 30));
        if let Some(alert) = monitor.handle(reading).await.unwrap() {
            alerts.push(alert);
        }
    }

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].decision.severity, Severity::High);
    assert_eq!(alerts[0].decision.value, 8.7);
    assert_eq!(alerts[0].dispatch.failed(), 0);

    let push = outbox.push.lock().unwrap();
    assert_eq!(push.len(), 2);
    assert!(push.iter().all(|(_, title, data)| title.contains("pH too high") && data["type"] == "ph_alert"));
    assert_eq!(outbox.email.lock().unwrap().len(), 1);
    assert_eq!(outbox.log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failing_push_still_emails() {
    // ---
    let outbox = Arc::new(Outbox::default());
    let (monitor, _tx) = monitor_with(&outbox, true, tokens(&["tok-phone"]));

    let alert = monitor
        .handle(SensorReading::new(SensorKind::WaterLevel, 12.0, t(0)))
        .await
        .expect("channel failures are not errors")
        .expect("critical water level fires");

    assert_eq!(alert.decision.severity, Severity::Critical);
    assert_eq!(alert.dispatch.failed(), 1);
    let email: Vec<_> = alert.dispatch.outcomes_for(Channel::Email).collect();
    assert_eq!(email[0].status, DeliveryStatus::Delivered);
    assert_eq!(outbox.email.lock().unwrap()[0].1, "🚨 Critical water level");
}

#[tokio::test]
async fn threshold_edits_apply_to_next_reading() {
    // ---
    let outbox = Arc::new(Outbox::default());
    let (monitor, tx) = monitor_with(&outbox, false, tokens(&[]));

    assert!(monitor
        .handle(SensorReading::new(SensorKind::Ph, 8.0, t(0)))
        .await
        .unwrap()
        .is_none());

    tx.send_modify(|cfg| cfg.max_ph = 7.8);

    let alert = monitor
        .handle(SensorReading::new(SensorKind::Ph, 8.0, t(10)))
        .await
        .unwrap()
        .expect("8.0 is above the edited maximum");
    assert_eq!(alert.decision.thresholds_snapshot.max, 7.8);
}

#[tokio::test]
async fn kinds_have_independent_cooldowns() {
    // ---
    let outbox = Arc::new(Outbox::default());
    let (monitor, _tx) = monitor_with(&outbox, false, tokens(&[]));

    let ph = monitor.handle(SensorReading::new(SensorKind::Ph, 5.5, t(0))).await.unwrap();
    let water = monitor
        .handle(SensorReading::new(SensorKind::WaterLevel, 50.0, t(1)))
        .await
        .unwrap();

    assert_eq!(ph.map(|a| a.decision.severity), Some(Severity::Low));
    assert_eq!(water.map(|a| a.decision.severity), Some(Severity::Low));
    assert_eq!(outbox.log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_reading_is_reported_and_harmless() {
    // ---
    let outbox = Arc::new(Outbox::default());
    let (monitor, _tx) = monitor_with(&outbox, false, tokens(&[]));

    let err = monitor
        .handle(SensorReading::new(SensorKind::Ph, f64::NAN, t(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, AlertError::InvalidReading { .. }));

    // The engine is still NORMAL, so the next excursion fires.
    assert!(monitor
        .handle(SensorReading::new(SensorKind::Ph, 9.1, t(1)))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn registry_failure_degrades_to_email_and_log() {
    // ---
    let outbox = Arc::new(Outbox::default());
    let (monitor, _tx) = monitor_with(&outbox, false, Arc::new(BrokenRegistry));

    let alert = monitor
        .handle(SensorReading::new(SensorKind::Ph, 9.0, t(0)))
        .await
        .unwrap()
        .unwrap();

    assert!(outbox.push.lock().unwrap().is_empty());
    assert_eq!(alert.dispatch.delivered(), 2);
    assert!(matches!(
        alert.dispatch.outcomes_for(Channel::Push).next().map(|o| &o.status),
        Some(DeliveryStatus::Skipped { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readings_of_one_kind_fire_once() {
    // ---
    let outbox = Arc::new(Outbox::default());
    let (monitor, _tx) = monitor_with(&outbox, false, tokens(&["tok"]));
    let monitor = Arc::new(monitor);

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let monitor = monitor.clone();
            tokio::spawn(async move {
                monitor
                    .handle(SensorReading::new(SensorKind::Ph, 9.0, t(i)))
                    .await
            })
        })
        .collect();

    let mut fired = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            fired += 1;
        }
    }

    assert_eq!(fired, 1);
    assert_eq!(outbox.push.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn custom_cooldown_is_honored() {
    // ---
    let outbox = Arc::new(Outbox::default());
    let dispatcher = Dispatcher::new(Arc::new(Log(outbox.clone())));
    let (_tx, rx) = watch::channel(settings());
    let monitor = Monitor::with_cooldown(dispatcher, rx, tokens(&[]), Duration::from_secs(10));

    let mut fired = 0;
    for (secs, value) in [(0, 9.0), (2, 7.0), (5, 9.0), (6, 7.0), (12, 9.0)] {
        if monitor
            .handle(SensorReading::new(SensorKind::Ph, value, t(secs)))
            .await
            .unwrap()
            .is_some()
        {
            fired += 1;
        }
    }

    assert_eq!(monitor.cooldown(), Duration::from_secs(10));
    assert_eq!(fired, 2);
}
