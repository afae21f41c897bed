//! A telemetry source polling an HTTP endpoint for the latest sensor payload.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::traits::{SourceError, TelemetryEvent, TelemetrySource};

const CHANNEL_CAPACITY: usize = 32;

/// Polls `url` and emits a [`TelemetryEvent`] whenever the response changes.
///
/// `404 Not Found` and a `null` body both mean the sensor has no current
/// value.
pub struct HttpPollingSource {
    url: Url,
    polling_interval: Duration,
    client: ClientWithMiddleware,
    cancellation_token: CancellationToken,
}

impl HttpPollingSource {
    /// Creates a new polling source.
    pub fn new(
        url: Url,
        polling_interval: Duration,
        client: ClientWithMiddleware,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self { url, polling_interval, client, cancellation_token }
    }
}

async fn poll_once(client: &ClientWithMiddleware, url: &Url) -> TelemetryEvent {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => return TelemetryEvent::Error(e.to_string()),
    };
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return TelemetryEvent::Payload(None);
    }
    if !status.is_success() {
        return TelemetryEvent::Error(format!("telemetry endpoint returned {status}"));
    }
    match response.json::<Value>().await {
        Ok(Value::Null) => TelemetryEvent::Payload(None),
        Ok(value) => TelemetryEvent::Payload(Some(value)),
        Err(e) => TelemetryEvent::Error(format!("invalid telemetry body: {e}")),
    }
}

#[async_trait]
impl TelemetrySource for HttpPollingSource {
    async fn subscribe(&self) -> Result<mpsc::Receiver<TelemetryEvent>, SourceError> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let client = self.client.clone();
        let url = self.url.clone();
        let polling_interval = self.polling_interval;
        let token = self.cancellation_token.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(polling_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut last: Option<TelemetryEvent> = None;

            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => {
                        tracing::info!("Telemetry poller cancellation signal received, shutting down...");
                        break;
                    }
                    _ = tx.closed() => break,
                    _ = interval.tick() => {
                        let event = poll_once(&client, &url).await;
                        if let TelemetryEvent::Error(ref message) = event {
                            tracing::warn!(url = %url, error = %message, "Telemetry poll failed.");
                        }
                        // Unchanged payloads are not redelivered.
                        if last.as_ref() == Some(&event) && matches!(event, TelemetryEvent::Payload(_)) {
                            continue;
                        }
                        last = Some(event.clone());
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::info!(url = %url, "Telemetry poller has shut down.");
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client() -> ClientWithMiddleware {
        reqwest_middleware::ClientBuilder::new(reqwest::Client::new()).build()
    }

    async fn next(rx: &mut mpsc::Receiver<TelemetryEvent>) -> TelemetryEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for telemetry")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_poll_once_maps_responses() {
        let mut server = mockito::Server::new_async().await;
        let _ok = server
            .mock("GET", "/ok")
            .with_header("content-type", "application/json")
            .with_body(r#"{"CO_ppm": 1.5}"#)
            .create_async()
            .await;
        let _null = server.mock("GET", "/null").with_body("null").create_async().await;
        let _missing = server.mock("GET", "/missing").with_status(404).create_async().await;
        let _broken = server.mock("GET", "/broken").with_status(503).create_async().await;

        let base = Url::parse(&server.url()).unwrap();
        let client = client();
        assert_eq!(
            poll_once(&client, &base.join("/ok").unwrap()).await,
            TelemetryEvent::Payload(Some(json!({"CO_ppm": 1.5})))
        );
        assert_eq!(poll_once(&client, &base.join("/null").unwrap()).await, TelemetryEvent::Payload(None));
        assert_eq!(
            poll_once(&client, &base.join("/missing").unwrap()).await,
            TelemetryEvent::Payload(None)
        );
        assert!(matches!(
            poll_once(&client, &base.join("/broken").unwrap()).await,
            TelemetryEvent::Error(_)
        ));
    }

    #[tokio::test]
    async fn test_subscribe_delivers_and_stops_on_cancel() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/latest")
            .with_body(r#"{"PM2_5_ug_m3": 12}"#)
            .expect_at_least(1)
            .create_async()
            .await;

        let token = CancellationToken::new();
        let source = HttpPollingSource::new(
            Url::parse(&format!("{}/latest", server.url())).unwrap(),
            Duration::from_millis(10),
            client(),
            token.clone(),
        );
        let mut rx = source.subscribe().await.unwrap();
        assert_eq!(next(&mut rx).await, TelemetryEvent::Payload(Some(json!({"PM2_5_ug_m3": 12}))));

        token.cancel();
        // Identical payloads are suppressed, so the channel just closes.
        let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert!(closed.is_none());
    }
}
