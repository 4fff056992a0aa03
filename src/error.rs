use crate::forecast::error::ForecastError;
use crate::provider::error::ProviderError;
use crate::render::error::RenderError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GfsWindowError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution(#[source] std::io::Error),
}
