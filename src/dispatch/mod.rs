//! Alert dispatcher: fans one [`AlertDecision`] out to the delivery channels.
//!
//! The dispatcher is a pure fan-out. It never looks up recipients itself (the
//! caller supplies a [`RecipientSet`]), never retries, and never lets one
//! channel's failure abort another's delivery. Every attempted, failed or
//! skipped delivery is reported in the returned [`DispatchResult`].

use std::{
    collections::{BTreeSet, VecDeque},
    fmt,
    sync::Arc,
};

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::channels::{ActivityLog, EmailChannel, PushChannel};
use crate::error::{AlertError, ChannelError};
use crate::models::{is_plausible_email, AlertDecision, ThresholdConfig};

mod message;

pub use message::AlertMessage;

// ---

/// How many recent decision ids are remembered to refuse redelivery.
const DISPATCHED_HISTORY: usize = 1024;

/// Who should hear about a decision. Collected by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipientSet {
    push_tokens: BTreeSet<String>,
    email: Option<String>,
}

impl RecipientSet {
    /// Blank tokens are dropped and duplicates collapse, so each device is
    /// addressed at most once. An implausible email address is dropped.
    pub fn new<I, S>(push_tokens: I, email: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        // ---
        let push_tokens = push_tokens
            .into_iter()
            .map(|t| t.into().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        let email = email
            .map(|e| e.trim().to_string())
            .filter(|e| is_plausible_email(e));
        Self { push_tokens, email }
    }

    /// Registered device tokens plus the address configured in `thresholds`.
    pub fn from_config<I, S>(push_tokens: I, thresholds: &ThresholdConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(push_tokens, thresholds.email_address.clone())
    }

    pub fn push_tokens(&self) -> impl Iterator<Item = &str> {
        self.push_tokens.iter().map(String::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Push,
    Email,
    ActivityLog,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Channel::Push => "push",
            Channel::Email => "email",
            Channel::ActivityLog => "activity log",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Delivered,
    Failed { error: String },
    Skipped { reason: String },
}

/// Outcome of one channel/recipient pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelOutcome {
    pub channel: Channel,
    /// Token, address or `None` for the activity log.
    pub recipient: Option<String>,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

impl ChannelOutcome {
    fn completed(channel: Channel, recipient: Option<&str>, result: Result<(), ChannelError>) -> Self {
        // ---
        let status = match result {
            Ok(()) => DeliveryStatus::Delivered,
            Err(e) => {
                tracing::warn!("{} delivery failed: {}", channel, e);
                DeliveryStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        Self {
            channel,
            recipient: recipient.map(String::from),
            status,
        }
    }

    fn skipped(channel: Channel, reason: &str) -> Self {
        Self {
            channel,
            recipient: None,
            status: DeliveryStatus::Skipped {
                reason: reason.to_string(),
            },
        }
    }
}

/// Per-channel report for one decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    pub decision_id: Uuid,
    /// `true` when the decision had already been dispatched and nothing was sent.
    pub duplicate: bool,
    pub outcomes: Vec<ChannelOutcome>,
}

impl DispatchResult {
    pub fn delivered(&self) -> usize {
        self.count(|s| matches!(s, DeliveryStatus::Delivered))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DeliveryStatus::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, DeliveryStatus::Skipped { .. }))
    }

    pub fn outcomes_for(&self, channel: Channel) -> impl Iterator<Item = &ChannelOutcome> {
        self.outcomes.iter().filter(move |o| o.channel == channel)
    }

    fn count(&self, pred: impl Fn(&DeliveryStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Fans decisions out to the injected channel capabilities.
pub struct Dispatcher {
    push: Option<Arc<dyn PushChannel>>,
    email: Option<Arc<dyn EmailChannel>>,
    activity_log: Arc<dyn ActivityLog>,
    dispatched: Mutex<VecDeque<Uuid>>,
}

impl Dispatcher {
    pub fn new(activity_log: Arc<dyn ActivityLog>) -> Self {
        Self {
            push: None,
            email: None,
            activity_log,
            dispatched: Mutex::new(VecDeque::with_capacity(DISPATCHED_HISTORY)),
        }
    }

    pub fn with_push(mut self, push: Arc<dyn PushChannel>) -> Self {
        self.push = Some(push);
        self
    }

    pub fn with_email(mut self, email: Arc<dyn EmailChannel>) -> Self {
        self.email = Some(email);
        self
    }

    /// Deliver `decision` on every enabled channel with a recipient.
    ///
    /// Channel failures are reported in the result, not returned as errors.
    /// Only a malformed decision is an error.
    pub async fn dispatch(
        &self,
        decision: &AlertDecision,
        thresholds: &ThresholdConfig,
        recipients: &RecipientSet,
    ) -> Result<DispatchResult, AlertError> {
        // ---
        decision.validate()?;

        if !self.claim(decision.id).await {
            tracing::warn!("Decision {} already dispatched, not redelivering", decision.id);
            return Ok(DispatchResult {
                decision_id: decision.id,
                duplicate: true,
                outcomes: Vec::new(),
            });
        }

        let message = AlertMessage::for_decision(decision);
        let message = &message;

        let push_outcomes = async {
            match (&self.push, thresholds.push_enabled) {
                (_, false) => vec![ChannelOutcome::skipped(Channel::Push, "push alerts disabled")],
                (None, true) => vec![ChannelOutcome::skipped(Channel::Push, "no push transport configured")],
                (Some(push), true) => {
                    let sends = recipients.push_tokens().map(|token| async move {
                        let result = push.deliver(token, &message.title, &message.body, &message.data).await;
                        ChannelOutcome::completed(Channel::Push, Some(token), result)
                    });
                    let outcomes = join_all(sends).await;
                    if outcomes.is_empty() {
                        vec![ChannelOutcome::skipped(Channel::Push, "no registered push tokens")]
                    } else {
                        outcomes
                    }
                }
            }
        };

        let email_outcome = async {
            match (&self.email, thresholds.email_enabled, recipients.email()) {
                (_, false, _) => ChannelOutcome::skipped(Channel::Email, "email alerts disabled"),
                (None, true, _) => ChannelOutcome::skipped(Channel::Email, "no email transport configured"),
                (Some(_), true, None) => ChannelOutcome::skipped(Channel::Email, "no email address configured"),
                (Some(email), true, Some(address)) => {
                    let result = email.deliver(address, &message.title, &message.body).await;
                    ChannelOutcome::completed(Channel::Email, Some(address), result)
                }
            }
        };

        let log_outcome = async {
            let result = self
                .activity_log
                .append(decision.fired_at, message.icon, &message.summary)
                .await;
            ChannelOutcome::completed(Channel::ActivityLog, None, result)
        };

        let (mut outcomes, email, log) = tokio::join!(push_outcomes, email_outcome, log_outcome);
        outcomes.push(email);
        outcomes.push(log);

        let result = DispatchResult {
            decision_id: decision.id,
            duplicate: false,
            outcomes,
        };
        tracing::info!(
            decision_id = %decision.id,
            delivered = result.delivered(),
            failed = result.failed(),
            skipped = result.skipped(),
            "Dispatched {} {} alert",
            decision.kind,
            decision.severity
        );
        Ok(result)
    }

    /// Record `id` as dispatched. Returns `false` if it already was.
    async fn claim(&self, id: Uuid) -> bool {
        // ---
        let mut dispatched = self.dispatched.lock().await;
        if dispatched.contains(&id) {
            return false;
        }
        if dispatched.len() == DISPATCHED_HISTORY {
            dispatched.pop_front();
        }
        dispatched.push_back(id);
        true
    }
}
