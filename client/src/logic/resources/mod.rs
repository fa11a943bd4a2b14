//! Data-fetch resources
//!
//! A [`Resource`] wraps one API call with a cached value, a loading state
//! and an optional freshness window. [`Keyed`] holds one resource per key
//! (per target dimension, per sample, ...).

pub mod dashboard;

pub use dashboard::Dashboard;

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::logic::error::ApiResult;

// ============================================================================
// FETCH STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        FetchState::Idle
    }
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            FetchState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

// ============================================================================
// RESOURCE
// ============================================================================

#[derive(Debug)]
struct Slot<T> {
    state: FetchState<T>,
    fetched_at: Option<Instant>,
}

#[derive(Debug)]
pub struct Resource<T> {
    slot: RwLock<Slot<T>>,
    /// `None` keeps a fetched value forever
    max_age: Option<Duration>,
}

impl<T: Clone> Resource<T> {
    pub fn new(max_age: Option<Duration>) -> Self {
        Self {
            slot: RwLock::new(Slot {
                state: FetchState::Idle,
                fetched_at: None,
            }),
            max_age,
        }
    }

    pub fn state(&self) -> FetchState<T> {
        self.slot.read().state.clone()
    }

    /// Cached value if it is still fresh
    pub fn cached(&self) -> Option<T> {
        let slot = self.slot.read();
        let fresh = match (slot.fetched_at, self.max_age) {
            (Some(_), None) => true,
            (Some(at), Some(max_age)) => at.elapsed() < max_age,
            (None, _) => false,
        };
        if fresh {
            slot.state.value().cloned()
        } else {
            None
        }
    }

    /// Cached value when fresh, otherwise fetch
    pub async fn get<F, Fut>(&self, fetch: F) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        match self.cached() {
            Some(value) => Ok(value),
            None => self.refresh(fetch).await,
        }
    }

    /// Always fetch
    pub async fn refresh<F, Fut>(&self, fetch: F) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        self.slot.write().state = FetchState::Loading;

        let outcome = fetch().await;

        let mut slot = self.slot.write();
        match &outcome {
            Ok(value) => {
                slot.state = FetchState::Ready(value.clone());
                slot.fetched_at = Some(Instant::now());
            }
            Err(e) => {
                slot.state = FetchState::Failed(e.to_string());
                slot.fetched_at = None;
            }
        }
        outcome
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.write();
        slot.state = FetchState::Idle;
        slot.fetched_at = None;
    }
}

// ============================================================================
// KEYED RESOURCES
// ============================================================================

#[derive(Debug)]
pub struct Keyed<K, T> {
    resources: Mutex<HashMap<K, Arc<Resource<T>>>>,
    max_age: Option<Duration>,
}

impl<K, T> Keyed<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    pub fn new(max_age: Option<Duration>) -> Self {
        Self {
            resources: Mutex::new(HashMap::new()),
            max_age,
        }
    }

    pub fn resource(&self, key: &K) -> Arc<Resource<T>> {
        self.resources
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Resource::new(self.max_age)))
            .clone()
    }

    pub async fn get<F, Fut>(&self, key: &K, fetch: F) -> ApiResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ApiResult<T>>,
    {
        self.resource(key).get(fetch).await
    }

    pub fn state(&self, key: &K) -> FetchState<T> {
        self.resources
            .lock()
            .get(key)
            .map(|r| r.state())
            .unwrap_or_default()
    }

    pub fn invalidate(&self) {
        self.resources.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::error::ApiError;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn counted(calls: &AtomicU32, value: u32) -> ApiResult<u32> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_value_is_reused() {
        let calls = AtomicU32::new(0);
        let resource = Resource::new(Some(Duration::from_secs(60)));

        assert_eq!(resource.get(|| counted(&calls, 1)).await, Ok(1));
        assert_eq!(resource.get(|| counted(&calls, 2)).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(resource.get(|| counted(&calls, 3)).await, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_max_age_always_fetches() {
        let calls = AtomicU32::new(0);
        let resource = Resource::new(Some(Duration::ZERO));

        resource.get(|| counted(&calls, 1)).await.unwrap();
        resource.get(|| counted(&calls, 1)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let resource: Resource<u32> = Resource::new(None);

        let err = resource.get(|| async { Err(ApiError::Timeout) }).await;
        assert_eq!(err, Err(ApiError::Timeout));
        assert_eq!(resource.state(), FetchState::Failed("Request timed out".into()));

        assert_eq!(resource.get(|| async { Ok(7) }).await, Ok(7));
        assert_eq!(resource.state().value(), Some(&7));

        resource.invalidate();
        assert_eq!(resource.state(), FetchState::Idle);
    }

    #[tokio::test]
    async fn test_keyed_holds_state_per_key() {
        let keyed: Keyed<&'static str, u32> = Keyed::new(None);

        keyed.get(&"arousal", || async { Ok(1) }).await.unwrap();
        keyed
            .get(&"valence", || async { Err(ApiError::Parse("bad".into())) })
            .await
            .unwrap_err();

        assert_eq!(keyed.state(&"arousal"), FetchState::Ready(1));
        assert_eq!(keyed.state(&"valence").error(), Some("Parse error: bad"));
        assert_eq!(keyed.state(&"other"), FetchState::Idle);
    }
}
