use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

use crate::domain::{
    interfaces::notification_sink::NotificationSink,
    value_objects::notifications::OrderNotification,
};

const LINE_PUSH_ENDPOINT: &str = "https://api.line.me/v2/bot/message/push";

/// Pushes order messages through the LINE Messaging API.
pub struct LineMessagingSink {
    channel_access_token: String,
    client: Client,
}

impl LineMessagingSink {
    pub fn new(channel_access_token: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|_| anyhow!("line: http client could not be built"))?;

        Ok(Self {
            channel_access_token,
            client,
        })
    }
}

fn push_body(notification: &OrderNotification) -> Value {
    json!({
        "to": notification.recipient,
        "messages": [
            { "type": "text", "text": notification.message_text() }
        ]
    })
}

#[async_trait]
impl NotificationSink for LineMessagingSink {
    async fn push(&self, notification: &OrderNotification) -> Result<()> {
        let response = self
            .client
            .post(LINE_PUSH_ENDPOINT)
            .bearer_auth(&self.channel_access_token)
            .json(&push_body(notification))
            .send()
            .await
            .map_err(sanitize_reqwest_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "line push returned non-success status: {}",
            response.status()
        ))
    }

    fn sink_name(&self) -> &'static str {
        "line"
    }
}

// reqwest errors can carry the request URL and headers; keep only the category.
fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("line push request timed out");
    }
    if error.is_connect() {
        return anyhow!("line push connection failed");
    }
    anyhow!("line push request failed")
}
