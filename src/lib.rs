mod error;
mod forecast;
mod forecast_client;
mod grid;
mod provider;
mod render;
mod types;
mod utils;

pub use error::GfsWindowError;
pub use forecast_client::*;

pub use forecast::error::ForecastError;
pub use forecast::horizon::{
    latest_available_step, latest_model_run, step_for_horizon, ForecastStep, Horizon,
    DEFAULT_SAMPLING_INTERVAL_HOURS,
};
pub use forecast::request::{ForecastRequest, WindowHalfWidths};

pub use grid::indexer::{nearest_grid_point, normalize_longitude, window_around};
pub use grid::lattice::{GridPoint, IndexWindow, Lattice};

pub use provider::cache::SubsetCache;
pub use provider::error::ProviderError;
pub use provider::memo::MemoizedProvider;
pub use provider::nomads::{clamp_window, NomadsProvider, DEFAULT_BASE_URL};
pub use provider::ForecastDataProvider;

pub use render::csv::CsvRenderer;
pub use render::error::RenderError;
pub use render::Renderer;

pub use types::grid_data::{
    bucket_steps, ForecastGrid, GridStats, GFS_PRECIP_BUCKET_HOURS, GRID_COLUMNS,
};
pub use types::lat_lon::LatLon;
pub use types::model_run::ModelRun;
