//! High-level entry point tying a [`ForecastDataProvider`] to the pure request builder.

use crate::error::GfsWindowError;
use crate::forecast::horizon::{latest_model_run, Horizon};
use crate::forecast::request::{ForecastRequest, WindowHalfWidths};
use crate::grid::lattice::Lattice;
use crate::provider::memo::MemoizedProvider;
use crate::provider::nomads::NomadsProvider;
use crate::provider::ForecastDataProvider;
use crate::types::grid_data::ForecastGrid;
use crate::types::lat_lon::LatLon;
use crate::types::model_run::ModelRun;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use bon::bon;
use haversine::{distance, Location as HaversineLocation, Units};
use log::info;
use std::path::PathBuf;

pub const DEFAULT_MODEL_ID: &str = "gfs_0p50";
pub const DEFAULT_VARIABLE: &str = "apcpsfc";

/// Resolves and fetches forecast windows through a provider.
///
/// Anything the caller leaves out (model run, horizon) is looked up through the
/// provider as "the latest available"; everything else is delegated to
/// [`ForecastRequest::builder`], so invalid input is rejected before any grid is
/// downloaded.
///
/// # Examples
///
/// ```rust,no_run
/// # use gfs_window::{GfsWindowError, LatLon, NomadsClient};
/// # #[tokio::main]
/// # async fn main() -> Result<(), GfsWindowError> {
/// let client = NomadsClient::nomads().call().await?;
/// let request = client
///     .request()
///     .poi(LatLon(-19.78753, -51.98899))
///     .hours(72.0)
///     .call()
///     .await?;
/// let grid = client.fetch(&request).await?;
/// println!("{:?}", grid.stats());
/// # Ok(())
/// # }
/// ```
pub struct ForecastClient<P> {
    provider: P,
}

/// The client the `precip-report` binary uses.
pub type NomadsClient = ForecastClient<MemoizedProvider<NomadsProvider>>;

#[bon]
impl NomadsClient {
    /// NOMADS-backed client that keeps fetched grids in memory and, unless
    /// disabled, in a parquet cache on disk.
    ///
    /// # Arguments
    ///
    /// * `.base_url(String)`: Optional. Server root, defaults to NOMADS.
    /// * `.lattice(Lattice)`: Optional. Lattice of the model, defaults to 0.5°.
    /// * `.cache_folder(PathBuf)`: Optional. Defaults to the system cache directory
    ///   (e.g. `~/.cache/gfs_window_cache` on Linux).
    /// * `.disable_cache(bool)`: Optional. Skips the on-disk cache entirely.
    ///
    /// # Errors
    ///
    /// Returns [`GfsWindowError::CacheDirResolution`] if there is no system cache directory,
    /// [`GfsWindowError::CacheDirCreation`] if it cannot be created.
    #[builder]
    pub async fn nomads(
        #[builder(into)] base_url: Option<String>,
        lattice: Option<Lattice>,
        cache_folder: Option<PathBuf>,
        disable_cache: Option<bool>,
    ) -> Result<Self, GfsWindowError> {
        let cache_folder = if disable_cache.unwrap_or(false) {
            None
        } else {
            let folder = match cache_folder {
                Some(folder) => folder,
                None => get_cache_dir().map_err(GfsWindowError::CacheDirResolution)?,
            };
            ensure_cache_dir_exists(&folder)
                .await
                .map_err(|e| GfsWindowError::CacheDirCreation(folder.clone(), e))?;
            Some(folder)
        };

        let provider = NomadsProvider::builder()
            .maybe_base_url(base_url)
            .maybe_lattice(lattice)
            .maybe_cache_dir(cache_folder)
            .build()?;
        Ok(Self::new(MemoizedProvider::new(provider)))
    }
}

#[bon]
impl<P: ForecastDataProvider> ForecastClient<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The most recent run the provider lists for `model_id`.
    pub async fn latest_model_run(&self, model_id: &str) -> Result<ModelRun, GfsWindowError> {
        let runs = self.provider.model_runs(model_id).await?;
        Ok(latest_model_run(model_id, &runs)?)
    }

    /// Builds a [`ForecastRequest`], filling in the latest model run and step when absent.
    ///
    /// # Arguments
    ///
    /// * `.poi(LatLon)`: **Required.** Point of interest.
    /// * `.model_id(&str)`: Optional. Defaults to `gfs_0p50`.
    /// * `.variable(&str)`: Optional. Defaults to `apcpsfc`.
    /// * `.model_run(ModelRun)`: Optional. Defaults to the latest listed run.
    /// * `.hours(f64)`: Optional. Hours after the run start; defaults to the last
    ///   step the run provides.
    /// * `.half_widths(WindowHalfWidths)`, `.sampling_interval_hours(f64)`: Optional,
    ///   passed on to the request builder.
    ///
    /// The grid point and window are resolved on the provider's lattice.
    ///
    /// # Errors
    ///
    /// [`GfsWindowError::Forecast`] for invalid input or when no run exists,
    /// [`GfsWindowError::Provider`] when the run or step lookup fails.
    #[builder]
    pub async fn request(
        &self,
        poi: LatLon,
        model_id: Option<&str>,
        variable: Option<&str>,
        model_run: Option<ModelRun>,
        hours: Option<f64>,
        half_widths: Option<WindowHalfWidths>,
        sampling_interval_hours: Option<f64>,
    ) -> Result<ForecastRequest, GfsWindowError> {
        let model_id = model_id.unwrap_or(DEFAULT_MODEL_ID);
        let variable = variable.unwrap_or(DEFAULT_VARIABLE);
        let lattice = self.provider.lattice();

        let model_run = match model_run {
            Some(run) => run,
            None => self.latest_model_run(model_id).await?,
        };
        let model_run_id = model_run.run_id(model_id);

        let horizon = match hours {
            Some(hours) => Horizon::Hours(hours),
            None => Horizon::Latest(
                self.provider
                    .available_steps(model_id, &model_run_id)
                    .await?,
            ),
        };

        let request = ForecastRequest::builder()
            .model_id(model_id)
            .model_run_id(&model_run_id)
            .variable(variable)
            .horizon(horizon)
            .poi(poi)
            .lattice(lattice)
            .maybe_half_widths(half_widths)
            .maybe_sampling_interval_hours(sampling_interval_hours)
            .build()?;

        let (lon_index, lat_index) = request.center_indices();
        let grid_lon = lattice.lon_at(lon_index as usize);
        let grid_lat = lattice.lat_at(lat_index as usize);
        let offset_km = distance(
            HaversineLocation {
                latitude: poi.lat(),
                longitude: poi.lon(),
            },
            HaversineLocation {
                latitude: grid_lat,
                longitude: grid_lon,
            },
            Units::Kilometers,
        );
        info!(
            "Resolved ({}, {}) to grid point ({}, {}), {:.1} km away: {}",
            poi.lat(),
            poi.lon(),
            grid_lat,
            grid_lon,
            offset_km,
            request
        );
        Ok(request)
    }

    pub async fn fetch(&self, request: &ForecastRequest) -> Result<ForecastGrid, GfsWindowError> {
        Ok(self.provider.fetch(request).await?)
    }
}
