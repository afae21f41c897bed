use std::{net::SocketAddr, sync::Arc};

use breatheasy::{
    coordinator::{Coordinator, CoordinatorConfig, CoordinatorDeps, CoordinatorHandle},
    http_server::{self, ApiState},
    models::ThresholdSet,
    providers::TelemetryEvent,
    test_helpers::{
        AnalysisCalls, ChannelTelemetrySource, PayloadBuilder, ScriptedAnalysisClient,
        StaticThresholdStore,
    },
};
use reqwest::Client;
use serde_json::Value;
use tokio::{sync::mpsc, task};
use tokio_util::sync::CancellationToken;

pub struct TestServer {
    pub address: SocketAddr,
    pub server_handle: task::JoinHandle<std::io::Result<()>>,
    pub client: Client,
    pub coordinator: CoordinatorHandle,
    pub thresholds: Arc<StaticThresholdStore>,
    telemetry: mpsc::Sender<TelemetryEvent>,
    _calls: AnalysisCalls,
    token: CancellationToken,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with_store(StaticThresholdStore::new(ThresholdSet::unlimited())).await
    }

    pub async fn with_store(store: StaticThresholdStore) -> Self {
        let token = CancellationToken::new();
        let thresholds = Arc::new(store);
        let (source, telemetry) = ChannelTelemetrySource::new();
        let (client, calls) = ScriptedAnalysisClient::new();
        let deps = CoordinatorDeps {
            telemetry: Arc::new(source),
            thresholds: thresholds.clone(),
            analysis: Arc::new(client),
            notifier: None,
        };
        let (coordinator, handle) =
            Coordinator::new(CoordinatorConfig::default(), deps, token.child_token());
        coordinator.spawn();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let address = listener.local_addr().expect("Failed to get address");
        let state = ApiState { coordinator: handle.clone() };
        let server_handle = task::spawn(http_server::serve(listener, state, token.child_token()));

        Self {
            address,
            server_handle,
            client: Client::new(),
            coordinator: handle,
            thresholds,
            telemetry,
            _calls: calls,
            token,
        }
    }

    pub async fn send_payload(&self, payload: PayloadBuilder) {
        self.telemetry
            .send(TelemetryEvent::Payload(Some(payload.build())))
            .await
            .expect("coordinator stopped");
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.expect("Request failed")
    }

    pub async fn get_json(&self, path: &str) -> Value {
        self.get(path).await.json().await.expect("Response was not JSON")
    }

    pub async fn put_json(&self, path: &str, body: Value) -> reqwest::Response {
        self.client.put(self.url(path)).json(&body).send().await.expect("Request failed")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client.delete(self.url(path)).send().await.expect("Request failed")
    }

    pub async fn cleanup(self) {
        self.token.cancel();
        let _ = self.server_handle.await;
    }
}
