//! HTTP implementation of [`AnalysisClient`].

use std::time::Duration;

use async_trait::async_trait;
use common_models::{
    AnalysisRequest, AnalysisResponse, ErrorResponse, RecommendationsRequest,
    RecommendationsResponse,
};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use super::{AnalysisClient, AnalysisError};
use crate::models::{DerivedInsight, Reading};

/// Talks to an analysis service exposing `POST /analysis` and
/// `POST /recommendations`.
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    base_url: Url,
    http_client: reqwest::Client,
}

impl HttpAnalysisClient {
    /// Creates a new client. `timeout` bounds each request.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, AnalysisError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, http_client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AnalysisError> {
        self.base_url
            .join(path)
            .map_err(|e| AnalysisError::InvalidResponse(format!("Invalid endpoint {path}: {e}")))
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AnalysisError> {
        let url = self.endpoint(path)?;
        let response = self.http_client.post(url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(AnalysisError::Status { status: status.as_u16(), message });
        }

        response.json::<T>().await.map_err(|e| AnalysisError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl AnalysisClient for HttpAnalysisClient {
    #[tracing::instrument(skip(self, reading), level = "debug")]
    async fn analyze(&self, reading: &Reading) -> Result<DerivedInsight, AnalysisError> {
        let request = AnalysisRequest::from(*reading);
        let recommendations_request = RecommendationsRequest::from(request);

        let (analysis, recommendations) = futures::try_join!(
            self.post::<_, AnalysisResponse>("analysis", &request),
            self.post::<_, RecommendationsResponse>("recommendations", &recommendations_request),
        )?;

        tracing::debug!(
            recommendations = recommendations.recommendations.len(),
            "Analysis service responded."
        );
        Ok(DerivedInsight::fresh(analysis.summary, recommendations.recommendations, *reading))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::{InsightStatus, Pollutant};

    fn client_for(server: &mockito::Server) -> HttpAnalysisClient {
        let base = Url::parse(&format!("{}/", server.url())).unwrap();
        HttpAnalysisClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_analyze_combines_summary_and_recommendations() {
        let mut server = mockito::Server::new_async().await;
        let analysis = server
            .mock("POST", "/analysis")
            .match_body(mockito::Matcher::PartialJson(json!({ "co": 3.0, "ch4Lpg": 0.0 })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"summary":"Moderate CO exposure."}"#)
            .create_async()
            .await;
        let recommendations = server
            .mock("POST", "/recommendations")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"recommendations":["Open a window."]}"#)
            .create_async()
            .await;

        let reading = Reading::default().with(Pollutant::Co, 3.0);
        let insight = client_for(&server).analyze(&reading).await.unwrap();

        analysis.assert_async().await;
        recommendations.assert_async().await;
        assert_eq!(insight.summary, "Moderate CO exposure.");
        assert_eq!(insight.recommendations, vec!["Open a window.".to_string()]);
        assert_eq!(insight.reading, reading);
        assert_eq!(insight.status, InsightStatus::Fresh);
    }

    #[tokio::test]
    async fn test_analyze_fails_when_either_request_fails() {
        let mut server = mockito::Server::new_async().await;
        let _analysis = server
            .mock("POST", "/analysis")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"summary":"ok"}"#)
            .create_async()
            .await;
        let _recommendations = server
            .mock("POST", "/recommendations")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"model overloaded"}"#)
            .create_async()
            .await;

        let result = client_for(&server).analyze(&Reading::default()).await;

        match result {
            Err(AnalysisError::Status { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "model overloaded");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pm10_field_name_differs_per_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let analysis = server
            .mock("POST", "/analysis")
            .match_body(mockito::Matcher::PartialJson(json!({ "pm10_0": 42.0 })))
            .with_status(200)
            .with_body(r#"{"summary":"ok"}"#)
            .create_async()
            .await;
        let recommendations = server
            .mock("POST", "/recommendations")
            .match_body(mockito::Matcher::PartialJson(json!({ "pm10": 42.0, "pm2_5": 0.0 })))
            .with_status(200)
            .with_body(r#"{"recommendations":[]}"#)
            .create_async()
            .await;

        let reading = Reading::default().with(Pollutant::Pm10, 42.0);
        client_for(&server).analyze(&reading).await.unwrap();

        analysis.assert_async().await;
        recommendations.assert_async().await;
    }

    #[tokio::test]
    async fn test_analyze_rejects_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _analysis = server
            .mock("POST", "/analysis")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;
        let _recommendations = server
            .mock("POST", "/recommendations")
            .with_status(200)
            .with_body(r#"{"recommendations":[]}"#)
            .create_async()
            .await;

        let result = client_for(&server).analyze(&Reading::default()).await;
        assert!(matches!(result, Err(AnalysisError::InvalidResponse(_))));
    }
}
