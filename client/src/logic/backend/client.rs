//! Prediction API client
//!
//! HTTP client for the NeuroFeel API. Every response is decoded into its
//! typed form and validated before it is handed out.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::dashboard::{ClassDistribution, ConfusionMatrices, DomainGap, FeatureMappingEntry, Overview};
use super::types::*;
use super::PredictionApi;
use crate::logic::config::ClientConfig;
use crate::logic::error::{error_detail, ApiError, ApiResult};

const CROSS_MODEL: &str = "/cross_dataset/model";
const DATASERVING: &str = "/cross_dataset/dataserving";
const WESAD_MODEL: &str = "/wesad/model";

/// NeuroFeel API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl ApiClient {
    /// Create new API client
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http_client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T>
    where
        T: DeserializeOwned + Validate,
    {
        let url = self.url(path);
        log::debug!("GET {}", url);

        let response = self.http_client.get(&url).query(query).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Validate,
    {
        let url = self.url(path);
        log::debug!("POST {}", url);

        let response = self.http_client.post(&url).json(body).send().await?;
        Self::decode(response).await
    }

    async fn decode<T>(response: reqwest::Response) -> ApiResult<T>
    where
        T: DeserializeOwned + Validate,
    {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = error_detail(&body);
            log::warn!("API request failed ({}): {}", status.as_u16(), detail);
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let value: T = serde_json::from_str(&body).map_err(|e| ApiError::Parse(e.to_string()))?;
        value.validate().map_err(ApiError::Invalid)?;
        Ok(value)
    }

    // ------------------------------------------------------------------
    // Cross-dataset model
    // ------------------------------------------------------------------

    /// Check model API health
    pub async fn health(&self) -> ApiResult<CrossHealth> {
        self.get_json(&format!("{}/health", CROSS_MODEL), &[]).await
    }

    /// Feature values and labels of one demo sample
    pub async fn sample_details(&self, direction: Direction, index: u32) -> ApiResult<SampleDetails> {
        let details: SampleDetails = self
            .get_json(&format!("{}/samples/{}/{}", CROSS_MODEL, direction, index), &[])
            .await?;

        if details.direction != direction || details.sample_index != index {
            return Err(ApiError::Invalid(format!(
                "details for {} sample {} returned for {} sample {}",
                details.direction, details.sample_index, direction, index
            )));
        }
        Ok(details)
    }

    /// Thresholds and estimators of the four cross-dataset models
    pub async fn model_info(&self) -> ApiResult<ModelInfo> {
        self.get_json(&format!("{}/models", CROSS_MODEL), &[]).await
    }

    // ------------------------------------------------------------------
    // Dashboard data
    // ------------------------------------------------------------------

    pub async fn overview(&self) -> ApiResult<Overview> {
        self.get_json(&format!("{}/overview", DATASERVING), &[]).await
    }

    pub async fn confusion_matrices(&self, target: Dimension) -> ApiResult<ConfusionMatrices> {
        self.get_json(
            &format!("{}/visualize/confusion_matrices", DATASERVING),
            &[("target", target.to_string())],
        )
        .await
    }

    pub async fn domain_gap(&self, target: Dimension) -> ApiResult<DomainGap> {
        self.get_json(
            &format!("{}/visualize/domain_gap", DATASERVING),
            &[("target", target.to_string())],
        )
        .await
    }

    pub async fn feature_mapping(&self, target: Dimension) -> ApiResult<Vec<FeatureMappingEntry>> {
        self.get_json(
            &format!("{}/features/mapping", DATASERVING),
            &[("target", target.to_string())],
        )
        .await
    }

    pub async fn class_distribution(&self) -> ApiResult<ClassDistribution> {
        self.get_json(&format!("{}/visualize/class_distribution", DATASERVING), &[])
            .await
    }

    // ------------------------------------------------------------------
    // WESAD personalised model
    // ------------------------------------------------------------------

    /// Subjects with held-out test data
    pub async fn wesad_subjects(&self) -> ApiResult<Vec<SubjectInfo>> {
        self.get_json(&format!("{}/subjects", WESAD_MODEL), &[]).await
    }

    /// All four models scored on every test sample of `subject_id`
    pub async fn wesad_evaluation(&self, subject_id: u32) -> ApiResult<EvaluationResult> {
        let evaluation: EvaluationResult = self
            .get_json(&format!("{}/evaluate/{}", WESAD_MODEL, subject_id), &[])
            .await?;

        if evaluation.subject_id != subject_id {
            return Err(ApiError::Invalid(format!(
                "evaluation for subject {} returned for subject {}",
                evaluation.subject_id, subject_id
            )));
        }
        Ok(evaluation)
    }

    /// Mean metrics across all subjects
    pub async fn wesad_overall_performance(&self) -> ApiResult<OverallPerformance> {
        self.get_json(&format!("{}/overall_performance", WESAD_MODEL), &[])
            .await
    }
}

#[async_trait]
impl PredictionApi for ApiClient {
    async fn available_samples(&self) -> ApiResult<AvailableSamples> {
        self.get_json(&format!("{}/available-samples", CROSS_MODEL), &[])
            .await
    }

    async fn predict(&self, request: &PredictionRequest) -> ApiResult<PredictionResult> {
        let result: PredictionResult = self
            .post_json(&format!("{}/predict", CROSS_MODEL), request)
            .await?;

        result.check_matches(request).map_err(ApiError::Invalid)?;
        log::debug!(
            "Prediction for {} sample {} received",
            request.direction,
            request.sample_index
        );
        Ok(result)
    }

    async fn predict_wesad(&self, request: &WesadPredictionRequest) -> ApiResult<WesadPrediction> {
        self.get_json(
            &format!("{}/predict/{}", WESAD_MODEL, request.subject_id),
            &[("sample_index", request.sample_index.to_string())],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_path() {
        let client = ApiClient::new(ClientConfig::with_api_url("http://api.local:8000/")).unwrap();
        assert_eq!(
            client.url("/cross_dataset/model/health"),
            "http://api.local:8000/cross_dataset/model/health"
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let client = ApiClient::new(ClientConfig::with_api_url("http://127.0.0.1:1")).unwrap();
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_) | ApiError::Timeout));
    }
}
