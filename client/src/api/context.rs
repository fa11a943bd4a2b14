//! Application context shared by every command

use std::sync::Arc;

use crate::logic::backend::{ApiClient, PredictionApi};
use crate::logic::config::ClientConfig;
use crate::logic::error::ApiResult;
use crate::logic::prediction::{BatchOrchestrator, CrossDatasetFlow, WesadFlow};
use crate::logic::resources::Dashboard;
use crate::logic::session::SessionStore;

pub struct AppContext {
    pub config: ClientConfig,
    pub client: Arc<ApiClient>,
    pub store: SessionStore,
    pub dashboard: Dashboard,
    pub cross_flow: CrossDatasetFlow,
    pub wesad_flow: WesadFlow,
    pub batch: BatchOrchestrator,
}

impl AppContext {
    pub fn new(config: ClientConfig) -> ApiResult<Self> {
        let client = Arc::new(ApiClient::new(config.clone())?);
        let api: Arc<dyn PredictionApi> = client.clone();
        let store = SessionStore::new(config.history_capacity);

        log::debug!("Using prediction API at {}", config.base_url());

        Ok(Self {
            dashboard: Dashboard::new(client.clone()),
            cross_flow: CrossDatasetFlow::new(api.clone(), store.clone()),
            wesad_flow: WesadFlow::new(api.clone(), store.clone()),
            batch: BatchOrchestrator::new(api, store.clone(), &config),
            config,
            client,
            store,
        })
    }
}
