//! Push transport backed by the Expo push service.
//!
//! Device tokens registered by the mobile app are Expo push tokens, so alerts
//! are posted to the Expo push API rather than to FCM directly.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::PushChannel;
use crate::error::ChannelError;

// ---

pub const EXPO_PUSH_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Key in the structured payload naming the Android notification channel.
pub const ANDROID_CHANNEL_KEY: &str = "androidChannelId";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExpoMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    data: &'a BTreeMap<String, String>,
    sound: &'static str,
    priority: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ExpoResponse {
    #[serde(default)]
    data: Vec<ExpoTicket>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Sends one push message per call to the Expo push API.
#[derive(Debug, Clone)]
pub struct ExpoPush {
    client: Client,
    url: String,
    access_token: Option<String>,
    timeout: Duration,
}

impl ExpoPush {
    /// `client` should already carry `timeout`; it is kept here to label
    /// timeout failures.
    pub fn new(client: Client, url: impl Into<String>, access_token: Option<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            access_token,
            timeout,
        }
    }
}

#[async_trait]
impl PushChannel for ExpoPush {
    async fn deliver(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<(), ChannelError> {
        // ---
        let message = ExpoMessage {
            to: token,
            title,
            body,
            data,
            sound: "default",
            priority: "high",
            channel_id: data.get(ANDROID_CHANNEL_KEY).map(String::as_str),
        };

        let mut request = self.client.post(&self.url).json(&[message]);
        if let Some(access_token) = &self.access_token {
            request = request.bearer_auth(access_token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ExpoResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::from_reqwest(e, self.timeout))?;

        // A 200 can still carry a per-message error ticket.
        match parsed.data.into_iter().find(|ticket| ticket.status != "ok") {
            Some(ticket) => Err(ChannelError::Rejected {
                status: status.as_u16(),
                message: ticket
                    .message
                    .unwrap_or_else(|| format!("ticket status {}", ticket.status)),
            }),
            None => {
                tracing::debug!("Push delivered to token {}", redact_token(token));
                Ok(())
            }
        }
    }
}

/// Keep tokens out of logs beyond a short prefix.
pub(crate) fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(18).collect();
    format!("{prefix}…")
}
