use crate::render::error::RenderError;
use crate::render::Renderer;
use crate::types::grid_data::ForecastGrid;
use bon::bon;
use log::info;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes a grid as long-format CSV (`time`, `lat`, `lon`, `value`).
///
/// The grid is written as fetched. With `bucket_steps` set, the time axis is
/// first reduced to one accumulated total per cell (see
/// [`ForecastGrid::accumulated`]), which is what a precipitation map is drawn from.
#[derive(Debug, Clone)]
pub struct CsvRenderer {
    path: PathBuf,
    bucket_steps: Option<usize>,
}

#[bon]
impl CsvRenderer {
    #[builder]
    pub fn new(#[builder(into)] path: PathBuf, bucket_steps: Option<usize>) -> Self {
        Self { path, bucket_steps }
    }
}

impl CsvRenderer {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Renderer for CsvRenderer {
    fn render(&self, grid: &ForecastGrid) -> Result<PathBuf, RenderError> {
        if grid.is_empty() {
            return Err(RenderError::EmptyGrid(grid.variable.clone()));
        }

        let mut df = match self.bucket_steps {
            Some(steps) => grid.accumulated(steps).to_dataframe()?,
            None => grid.to_dataframe()?,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| RenderError::OutputDirCreation(parent.to_path_buf(), e))?;
        }
        let mut file = fs::File::create(&self.path)
            .map_err(|e| RenderError::OutputWrite(self.path.clone(), e))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| RenderError::Encode(self.path.clone(), e))?;

        info!(
            "Wrote {} rows of {} to {:?}",
            df.height(),
            grid.variable,
            self.path
        );
        Ok(self.path.clone())
    }
}
