//! Turning fetched grids into artifacts.

pub mod csv;
pub mod error;

use crate::render::error::RenderError;
use crate::types::grid_data::ForecastGrid;
use std::path::PathBuf;

/// Produces a visual or tabular artifact from a raw grid.
///
/// Renderers receive the grid exactly as the provider returned it.
pub trait Renderer {
    /// Renders `grid` and returns the path of the written artifact.
    fn render(&self, grid: &ForecastGrid) -> Result<PathBuf, RenderError>;
}
