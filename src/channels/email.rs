//! Email transport that posts to an HTTP mail relay.
//!
//! The relay accepts `{to, subject, message}` JSON and answers 2xx once the
//! message is queued.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::EmailChannel;
use crate::error::ChannelError;

// ---

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    to: &'a str,
    subject: &'a str,
    message: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpEmailRelay {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpEmailRelay {
    pub fn new(client: Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl EmailChannel for HttpEmailRelay {
    async fn deliver(&self, address: &str, subject: &str, body: &str) -> Result<(), ChannelError> {
        // ---
        let response = self
            .client
            .post(&self.url)
            .json(&RelayRequest {
                to: address,
                subject,
                message: body,
            })
            .send()
            .await
            .map_err(|e| ChannelError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("Email alert queued for {}", address);
            Ok(())
        } else {
            Err(ChannelError::Rejected {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }
}
