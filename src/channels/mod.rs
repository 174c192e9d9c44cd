//! Delivery channel capabilities consumed by the dispatcher.
//!
//! Each channel exposes a single delivery operation. Transports own their
//! own timeouts and retry policy; the dispatcher only records the outcome.
//!
//! Follows the Explicit Module Boundary Pattern (EMBP): the traits live in
//! this gateway, concrete transports in sibling modules.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ChannelError;

mod activity_log;
mod email;
mod expo;

pub use activity_log::{ActivityEntry, PgActivityLog};
pub use email::HttpEmailRelay;
pub use expo::{ExpoPush, ANDROID_CHANNEL_KEY, EXPO_PUSH_URL};

// ---

/// Mobile push notifications addressed to a device token.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn deliver(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<(), ChannelError>;
}

/// Email addressed to a single mailbox.
#[async_trait]
pub trait EmailChannel: Send + Sync {
    async fn deliver(&self, address: &str, subject: &str, body: &str) -> Result<(), ChannelError>;
}

/// The in-app activity log shown on the logs screen.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn append(&self, at: DateTime<Utc>, icon: &str, message: &str) -> Result<(), ChannelError>;
}
