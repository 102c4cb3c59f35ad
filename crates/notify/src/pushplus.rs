// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PushPlus push-message adapter.
//!
//! Sends the HTML message to the PushPlus endpoint. Transient failures
//! (transport errors, rate limiting) are retried with exponential backoff;
//! anything else is logged and given up on immediately.

use super::{silent_mode_active, NotifyAdapter, NotifyError};
use async_trait::async_trait;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "https://www.pushplus.plus/send";

/// Per-attempt request timeout.
const SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Total attempts, including the first.
const MAX_ATTEMPTS: u32 = 3;

/// Backoff before retry `n` (1-based): `2s, 4s, ...` capped at 8s.
fn backoff_delay(base: Duration, retry: u32) -> Duration {
    let delay = base * 2u32.saturating_pow(retry - 1);
    delay.min(base * 4)
}

pub struct PushPlusNotifier {
    token: String,
    endpoint: String,
    backoff_base: Duration,
    client: reqwest::Client,
}

impl PushPlusNotifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            backoff_base: Duration::from_secs(2),
            client: reqwest::Client::new(),
        }
    }

    /// Point the adapter at a different endpoint (tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Shrink the backoff base (tests).
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// One POST attempt. `Ok(true)` delivered, `Ok(false)` retryable,
    /// `Err` permanent.
    async fn attempt(&self, title: &str, content: &str) -> Result<bool, NotifyError> {
        let payload = serde_json::json!({
            "token": self.token,
            "title": title,
            "content": content,
            "template": "html",
        });

        let response = match self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .timeout(SEND_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "push request failed");
                return Ok(false);
            }
        };

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!("push rate limited (HTTP 429), will retry");
            return Ok(false);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NotifyError::SendFailed(format!("invalid response body: {e}")))?;

        match body.get("code").and_then(|c| c.as_i64()) {
            Some(200) => Ok(true),
            Some(429) => {
                tracing::warn!("push rate limited (code 429), will retry");
                Ok(false)
            }
            other => Err(NotifyError::SendFailed(format!(
                "push rejected: code {:?}, body {}",
                other, body
            ))),
        }
    }
}

#[async_trait]
impl NotifyAdapter for PushPlusNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        // Checked per send so runtime .env edits apply to the next task.
        if silent_mode_active() {
            tracing::debug!("silent mode active, dropping notification");
            return Ok(());
        }

        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                let delay = backoff_delay(self.backoff_base, attempt - 1);
                tracing::info!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying push send"
                );
                tokio::time::sleep(delay).await;
            }

            if self.attempt(title, message).await? {
                tracing::info!("push notification delivered");
                return Ok(());
            }
        }

        Err(NotifyError::SendFailed(format!(
            "gave up after {MAX_ATTEMPTS} attempts"
        )))
    }
}

#[cfg(test)]
#[path = "pushplus_tests.rs"]
mod tests;
