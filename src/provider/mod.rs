//! The boundary between request resolution and whatever executes the request.

pub mod cache;
pub mod dods;
pub mod error;
pub mod memo;
pub mod nomads;

use crate::forecast::horizon::ForecastStep;
use crate::forecast::request::ForecastRequest;
use crate::grid::lattice::Lattice;
use crate::provider::error::ProviderError;
use crate::types::grid_data::ForecastGrid;
use crate::types::model_run::ModelRun;
use async_trait::async_trait;

/// A source of gridded forecast data.
///
/// Implementations turn a [`ForecastRequest`] into whatever call their service
/// needs and hand back the raw grid. How indices outside the lattice are treated
/// is up to the implementation.
#[async_trait]
pub trait ForecastDataProvider: Send + Sync {
    /// Lattice of the served model. Requests are resolved against it.
    fn lattice(&self) -> Lattice {
        Lattice::default()
    }

    /// Runs published for `model_id`, oldest first.
    async fn model_runs(&self, model_id: &str) -> Result<Vec<ModelRun>, ProviderError>;

    /// Forecast steps available in a run, in ascending order.
    async fn available_steps(
        &self,
        model_id: &str,
        model_run_id: &str,
    ) -> Result<Vec<ForecastStep>, ProviderError>;

    /// Fetches the subset described by `request`.
    async fn fetch(&self, request: &ForecastRequest) -> Result<ForecastGrid, ProviderError>;
}
