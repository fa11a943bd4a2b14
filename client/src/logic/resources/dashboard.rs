//! Dashboard resources
//!
//! One cached resource per dashboard endpoint. Health is never cached;
//! everything else stays fresh for the configured cache TTL.

use std::sync::Arc;
use std::time::Duration;

use super::{FetchState, Keyed, Resource};
use crate::logic::backend::{
    mapping_importances, ApiClient, AvailableSamples, ClassDistribution, ConfusionMatrices,
    CrossHealth, Dimension, Direction, DomainGap, EvaluationResult, FeatureMappingEntry, ModelInfo,
    OverallPerformance, Overview, PredictionApi, SampleDetails, SubjectInfo,
};
use crate::logic::error::ApiResult;
use crate::logic::ranking::{rank_features, RankedFeature};

pub struct Dashboard {
    client: Arc<ApiClient>,
    health: Resource<CrossHealth>,
    samples: Resource<AvailableSamples>,
    models: Resource<ModelInfo>,
    overview: Resource<Overview>,
    class_distribution: Resource<ClassDistribution>,
    subjects: Resource<Vec<SubjectInfo>>,
    overall_performance: Resource<OverallPerformance>,
    evaluations: Keyed<u32, EvaluationResult>,
    sample_details: Keyed<(Direction, u32), SampleDetails>,
    confusion: Keyed<Dimension, ConfusionMatrices>,
    domain_gap: Keyed<Dimension, DomainGap>,
    feature_mapping: Keyed<Dimension, Vec<FeatureMappingEntry>>,
}

impl Dashboard {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let ttl = Some(client.config().cache_ttl);

        Self {
            client,
            health: Resource::new(Some(Duration::ZERO)),
            samples: Resource::new(ttl),
            models: Resource::new(ttl),
            overview: Resource::new(ttl),
            class_distribution: Resource::new(ttl),
            subjects: Resource::new(ttl),
            overall_performance: Resource::new(ttl),
            evaluations: Keyed::new(ttl),
            sample_details: Keyed::new(ttl),
            confusion: Keyed::new(ttl),
            domain_gap: Keyed::new(ttl),
            feature_mapping: Keyed::new(ttl),
        }
    }

    pub async fn health(&self) -> ApiResult<CrossHealth> {
        self.health.get(|| self.client.health()).await
    }

    pub fn health_state(&self) -> FetchState<CrossHealth> {
        self.health.state()
    }

    pub async fn samples(&self) -> ApiResult<AvailableSamples> {
        self.samples.get(|| self.client.available_samples()).await
    }

    pub async fn model_info(&self) -> ApiResult<ModelInfo> {
        self.models.get(|| self.client.model_info()).await
    }

    pub async fn sample_details(&self, direction: Direction, index: u32) -> ApiResult<SampleDetails> {
        self.sample_details
            .get(&(direction, index), || self.client.sample_details(direction, index))
            .await
    }

    pub async fn overview(&self) -> ApiResult<Overview> {
        self.overview.get(|| self.client.overview()).await
    }

    pub async fn confusion_matrices(&self, target: Dimension) -> ApiResult<ConfusionMatrices> {
        self.confusion
            .get(&target, || self.client.confusion_matrices(target))
            .await
    }

    pub async fn domain_gap(&self, target: Dimension) -> ApiResult<DomainGap> {
        self.domain_gap
            .get(&target, || self.client.domain_gap(target))
            .await
    }

    pub async fn feature_mapping(&self, target: Dimension) -> ApiResult<Vec<FeatureMappingEntry>> {
        self.feature_mapping
            .get(&target, || self.client.feature_mapping(target))
            .await
    }

    pub fn feature_mapping_state(&self, target: Dimension) -> FetchState<Vec<FeatureMappingEntry>> {
        self.feature_mapping.state(&target)
    }

    /// Most important mapped features of `target`
    pub async fn ranked_features(&self, target: Dimension, top_n: usize) -> ApiResult<Vec<RankedFeature>> {
        let mapping = self.feature_mapping(target).await?;
        Ok(rank_features(&mapping_importances(&mapping), top_n))
    }

    pub async fn class_distribution(&self) -> ApiResult<ClassDistribution> {
        self.class_distribution
            .get(|| self.client.class_distribution())
            .await
    }

    pub async fn wesad_subjects(&self) -> ApiResult<Vec<SubjectInfo>> {
        self.subjects.get(|| self.client.wesad_subjects()).await
    }

    pub async fn wesad_evaluation(&self, subject_id: u32) -> ApiResult<EvaluationResult> {
        self.evaluations
            .get(&subject_id, || self.client.wesad_evaluation(subject_id))
            .await
    }

    pub fn wesad_evaluation_state(&self, subject_id: u32) -> FetchState<EvaluationResult> {
        self.evaluations.state(&subject_id)
    }

    pub async fn wesad_overall_performance(&self) -> ApiResult<OverallPerformance> {
        self.overall_performance
            .get(|| self.client.wesad_overall_performance())
            .await
    }

    /// Drop every cached payload
    pub fn invalidate(&self) {
        self.health.invalidate();
        self.samples.invalidate();
        self.models.invalidate();
        self.overview.invalidate();
        self.class_distribution.invalidate();
        self.subjects.invalidate();
        self.overall_performance.invalidate();
        self.evaluations.invalidate();
        self.sample_details.invalidate();
        self.confusion.invalidate();
        self.domain_gap.invalidate();
        self.feature_mapping.invalidate();
        log::debug!("Dashboard cache cleared");
    }
}
