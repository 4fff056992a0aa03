use crate::forecast::request::ForecastRequest;
use crate::provider::error::ProviderError;
use crate::types::grid_data::ForecastGrid;
use log::{debug, info};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tokio::{fs, task};

/// On-disk parquet cache of fetched subsets.
///
/// A published model run never changes, so an entry stays valid for as long as
/// the run id it was fetched for. Entries are keyed on every field of the request.
#[derive(Debug, Clone)]
pub struct SubsetCache {
    cache_dir: PathBuf,
}

impl SubsetCache {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// File the subset for `request` is cached in.
    pub fn path_for(&self, request: &ForecastRequest) -> PathBuf {
        let [t0, t1] = request.time_range();
        let [y0, y1] = request.lat_window();
        let [x0, x1] = request.lon_window();
        let file_name = format!(
            "{}-{}-{}-t{}_{}-y{}_{}-x{}_{}.parquet",
            request.model_id(),
            request.model_run_id().replace('/', "-"),
            request.variable(),
            t0,
            t1,
            y0,
            y1,
            x0,
            x1
        );
        self.cache_dir.join(file_name)
    }

    /// Returns the cached subset for `request`, or `None` on a cache miss.
    pub async fn load(
        &self,
        request: &ForecastRequest,
    ) -> Result<Option<ForecastGrid>, ProviderError> {
        let parquet_path = self.path_for(request);
        if fs::metadata(&parquet_path).await.is_err() {
            debug!("Cache miss for {} at {:?}", request, parquet_path);
            return Ok(None);
        }

        info!("Cache hit for {} at {:?}", request, parquet_path);
        let variable = request.variable().to_string();
        let grid = task::spawn_blocking(move || {
            let df = LazyFrame::scan_parquet(&parquet_path, Default::default())
                .and_then(|lf| lf.collect())
                .map_err(|e| ProviderError::ParquetRead(parquet_path.clone(), e))?;
            ForecastGrid::from_dataframe(variable, &df)
                .map_err(|e| ProviderError::ParquetRead(parquet_path, e))
        })
        .await??;
        Ok(Some(grid))
    }

    /// Writes `grid` as the cached subset for `request`, returning the file path.
    pub async fn store(
        &self,
        request: &ForecastRequest,
        grid: &ForecastGrid,
    ) -> Result<PathBuf, ProviderError> {
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| ProviderError::CacheDirCreation(self.cache_dir.clone(), e))?;

        let parquet_path = self.path_for(request);
        let df = grid.to_dataframe()?;
        Self::write_parquet(df, &parquet_path).await?;
        info!("Cached {} to {:?}", request, parquet_path);
        Ok(parquet_path)
    }

    /// Removes every cached subset.
    pub async fn clear(&self) -> Result<(), ProviderError> {
        match fs::remove_dir_all(&self.cache_dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProviderError::CacheDeletion(self.cache_dir.clone(), e)),
        }
    }

    /// Writes a DataFrame to a Parquet file using spawn_blocking.
    async fn write_parquet(mut df: DataFrame, path: &Path) -> Result<(), ProviderError> {
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let file = std::fs::File::create(&path_buf)
                .map_err(|e| ProviderError::ParquetWriteIo(path_buf.clone(), e))?;
            ParquetWriter::new(file)
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| ProviderError::ParquetWritePolars(path_buf, e))?;
            Ok::<(), ProviderError>(())
        })
        .await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::lat_lon::LatLon;

    fn request() -> ForecastRequest {
        ForecastRequest::builder()
            .model_id("gfs_0p50")
            .model_run_id("gfs20240115/gfs_0p50_00z")
            .variable("apcpsfc")
            .horizon(6.0)
            .poi(LatLon(-19.78753, -51.98899))
            .build()
            .unwrap()
    }

    fn grid() -> ForecastGrid {
        ForecastGrid::new(
            "apcpsfc",
            vec![1.0, 2.0, 3.0],
            vec![-20.0],
            vec![307.5, 308.0],
            vec![0.0, 0.5, f64::NAN, 1.5, 2.0, 2.5],
        )
        .unwrap()
    }

    #[test]
    fn test_path_for_encodes_every_field() {
        let cache = SubsetCache::new(Path::new("/tmp/gfs"));
        let path = cache.path_for(&request());
        assert_eq!(
            path,
            PathBuf::from(
                "/tmp/gfs/gfs_0p50-gfs20240115-gfs_0p50_00z-apcpsfc-t0_2-y126_154-x604_628.parquet"
            )
        );
    }

    #[tokio::test]
    async fn test_store_then_load() -> Result<(), ProviderError> {
        let dir = tempfile::tempdir().expect("temp dir");
        let cache = SubsetCache::new(&dir.path().join("nested"));
        let request = request();

        assert!(cache.load(&request).await?.is_none());

        let path = cache.store(&request, &grid()).await?;
        assert!(path.exists());

        let loaded = cache.load(&request).await?.expect("cache hit");
        assert_eq!(loaded.shape(), [3, 1, 2]);
        assert_eq!(loaded.value(2, 0, 1), Some(2.5));
        assert!(loaded.value(1, 0, 0).unwrap().is_nan());

        cache.clear().await?;
        assert!(cache.load(&request).await?.is_none());
        // clearing twice is fine
        cache.clear().await?;
        Ok(())
    }
}
