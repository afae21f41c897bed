//! Webhook alert delivery.
//!
//! Alerts are POSTed as JSON. When a secret is configured the request carries
//! an `X-Signature` header holding the hex HMAC-SHA256 of the body followed by
//! the `X-Timestamp` value.

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use sha2::Sha256;
use url::Url;

use super::{AlertNotifier, error::NotificationError};
use crate::models::Alert;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: HeaderName = HeaderName::from_static("x-signature");
const TIMESTAMP_HEADER: HeaderName = HeaderName::from_static("x-timestamp");

/// Body of a webhook request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AlertPayload<'a> {
    /// Short text suitable for SMS relays.
    message: String,
    alert: &'a Alert,
}

impl<'a> AlertPayload<'a> {
    fn new(alert: &'a Alert) -> Self {
        Self { message: format!("URGENT: Air quality alert. {}", alert.message), alert }
    }
}

/// Forwards alerts to a webhook endpoint.
#[derive(Debug)]
pub struct WebhookNotifier {
    url: Url,
    client: ClientWithMiddleware,
    secret: Option<String>,
}

impl WebhookNotifier {
    /// Creates a notifier posting to `url` through `client`.
    pub fn new(
        url: Url,
        secret: Option<String>,
        client: ClientWithMiddleware,
    ) -> Result<Self, NotificationError> {
        // HMAC accepts an empty key; a webhook must not.
        if secret.as_deref().is_some_and(str::is_empty) {
            return Err(NotificationError::ConfigError(
                "webhook secret cannot be empty".to_string(),
            ));
        }
        Ok(Self { url, client, secret })
    }

    fn headers(&self, body: &[u8], timestamp: i64) -> Result<HeaderMap, NotificationError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(secret) = &self.secret {
            let signature = sign(secret, body, timestamp)?;
            headers.insert(
                SIGNATURE_HEADER,
                HeaderValue::from_str(&signature).map_err(|e| {
                    NotificationError::NotifyFailed(format!("Invalid signature value: {e}"))
                })?,
            );
            headers.insert(TIMESTAMP_HEADER, HeaderValue::from(timestamp));
        }
        Ok(headers)
    }
}

/// Hex HMAC-SHA256 of `body` followed by the decimal `timestamp`.
pub(crate) fn sign(secret: &str, body: &[u8], timestamp: i64) -> Result<String, NotificationError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| NotificationError::ConfigError(format!("Invalid secret: {e}")))?;
    mac.update(body);
    mac.update(timestamp.to_string().as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl AlertNotifier for WebhookNotifier {
    #[tracing::instrument(skip(self, alert), fields(alert_id = %alert.id), level = "debug")]
    async fn notify(&self, alert: &Alert) -> Result<(), NotificationError> {
        let body = serde_json::to_vec(&AlertPayload::new(alert))?;
        let headers = self.headers(&body, Utc::now().timestamp_millis())?;

        let response =
            self.client.post(self.url.clone()).headers(headers).body(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::NotifyFailed(format!(
                "Webhook request failed with status: {status}"
            )));
        }
        tracing::debug!("Alert delivered to webhook.");
        Ok(())
    }
}
