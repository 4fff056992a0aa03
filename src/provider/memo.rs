use crate::forecast::horizon::ForecastStep;
use crate::forecast::request::ForecastRequest;
use crate::grid::lattice::Lattice;
use crate::provider::error::ProviderError;
use crate::provider::ForecastDataProvider;
use crate::types::grid_data::ForecastGrid;
use crate::types::model_run::ModelRun;
use async_trait::async_trait;
use std::collections::{hash_map::Entry, HashMap};
use tokio::sync::Mutex;

/// Wraps a provider and keeps every fetched grid in memory, keyed by request.
pub struct MemoizedProvider<P> {
    inner: P,
    grid_cache: Mutex<HashMap<ForecastRequest, ForecastGrid>>,
}

impl<P: ForecastDataProvider> MemoizedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            grid_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub async fn cached_len(&self) -> usize {
        self.grid_cache.lock().await.len()
    }
}

#[async_trait]
impl<P: ForecastDataProvider> ForecastDataProvider for MemoizedProvider<P> {
    fn lattice(&self) -> Lattice {
        self.inner.lattice()
    }

    async fn model_runs(&self, model_id: &str) -> Result<Vec<ModelRun>, ProviderError> {
        self.inner.model_runs(model_id).await
    }

    async fn available_steps(
        &self,
        model_id: &str,
        model_run_id: &str,
    ) -> Result<Vec<ForecastStep>, ProviderError> {
        self.inner.available_steps(model_id, model_run_id).await
    }

    async fn fetch(&self, request: &ForecastRequest) -> Result<ForecastGrid, ProviderError> {
        {
            let cache = self.grid_cache.lock().await;
            if let Some(grid) = cache.get(request) {
                return Ok(grid.clone());
            }
        }

        // Fetch outside the lock
        let fetched = self.inner.fetch(request).await?;

        let mut cache = self.grid_cache.lock().await;
        match cache.entry(request.clone()) {
            // Another caller fetched the same request meanwhile, keep theirs
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                entry.insert(fetched.clone());
                Ok(fetched)
            }
        }
    }
}
