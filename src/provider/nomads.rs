//! A [`ForecastDataProvider`] backed by the NOMADS GrADS Data Server.
//!
//! Model runs are discovered from the server's directory listings, the number of
//! forecast steps is read from a run's `.dds` description and subsets are
//! downloaded as DODS ASCII, e.g.
//! `https://nomads.ncep.noaa.gov/dods/gfs_0p50/gfs20240115/gfs_0p50_00z.ascii?apcpsfc[0:116][126:154][604:628]`.

use crate::forecast::horizon::ForecastStep;
use crate::forecast::request::ForecastRequest;
use crate::grid::lattice::{IndexWindow, Lattice};
use crate::provider::cache::SubsetCache;
use crate::provider::dods::{
    parse_ascii_grid, parse_cycle_listing, parse_day_listing, parse_time_dimension,
};
use crate::provider::error::ProviderError;
use crate::provider::ForecastDataProvider;
use crate::types::grid_data::ForecastGrid;
use crate::types::model_run::ModelRun;
use async_trait::async_trait;
use bon::bon;
use chrono::NaiveDate;
use log::{debug, info, warn};
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://nomads.ncep.noaa.gov/dods";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Only the most recent days are listed when discovering runs.
const DAYS_TO_SCAN: usize = 2;

pub struct NomadsProvider {
    client: Client,
    base_url: String,
    lattice: Lattice,
    cache: Option<SubsetCache>,
}

#[bon]
impl NomadsProvider {
    /// Creates a provider.
    ///
    /// # Arguments
    ///
    /// * `.base_url(String)`: Optional. Server root, defaults to [`DEFAULT_BASE_URL`].
    /// * `.timeout(Duration)`: Optional. Per-request timeout, defaults to two minutes.
    /// * `.lattice(Lattice)`: Optional. Lattice of the served model, used to clamp
    ///   windows. Defaults to the 0.5° lattice.
    /// * `.cache_dir(PathBuf)`: Optional. Enables the parquet subset cache in this directory.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ClientBuild`] if the HTTP client cannot be created.
    #[builder]
    pub fn new(
        #[builder(into)] base_url: Option<String>,
        timeout: Option<Duration>,
        lattice: Option<Lattice>,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(ProviderError::ClientBuild)?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            lattice: lattice.unwrap_or_default(),
            cache: cache_dir.map(|dir| SubsetCache::new(&dir)),
        })
    }
}

impl NomadsProvider {
    pub fn cache(&self) -> Option<&SubsetCache> {
        self.cache.as_ref()
    }

    /// URL of the DODS ASCII subset for `request`, after clamping its window.
    pub fn subset_url(&self, request: &ForecastRequest) -> Result<String, ProviderError> {
        let window = clamp_window(&request.index_window(), &self.lattice)?;
        Ok(self.window_url(request, &window))
    }

    fn window_url(&self, request: &ForecastRequest, window: &IndexWindow) -> String {
        let [t0, t1] = request.time_range();
        format!(
            "{}/{}/{}.ascii?{}[{}:{}][{}:{}][{}:{}]",
            self.base_url,
            request.model_id(),
            request.model_run_id(),
            request.variable(),
            t0,
            t1,
            window.lat_range[0],
            window.lat_range[1],
            window.lon_range[0],
            window.lon_range[1]
        )
    }

    async fn get_text(&self, url: &str) -> Result<String, ProviderError> {
        info!("Downloading {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    ProviderError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    ProviderError::NetworkRequest(url.to_string(), e)
                });
            }
        };

        response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkRequest(url.to_string(), e))
    }
}

/// The most recent `DAYS_TO_SCAN` entries of an ascending day listing.
fn days_to_scan(days: &[NaiveDate]) -> &[NaiveDate] {
    &days[days.len().saturating_sub(DAYS_TO_SCAN)..]
}

/// Clamps a window to the lattice. DODS rejects constraints outside a
/// dataset's dimensions, so out-of-range indices are cut off here.
///
/// # Errors
///
/// Returns [`ProviderError::EmptyWindow`] if nothing of the window lies on the lattice.
pub fn clamp_window(window: &IndexWindow, lattice: &Lattice) -> Result<IndexWindow, ProviderError> {
    let clamp = |range: [i64; 2], count: usize| -> Option<[i64; 2]> {
        let max = count as i64 - 1;
        if range[1] < 0 || range[0] > max {
            return None;
        }
        Some([range[0].max(0), range[1].min(max)])
    };

    let empty = || ProviderError::EmptyWindow {
        lon_range: window.lon_range,
        lat_range: window.lat_range,
    };
    let clamped = IndexWindow {
        lon_range: clamp(window.lon_range, lattice.lon_count()).ok_or_else(empty)?,
        lat_range: clamp(window.lat_range, lattice.lat_count()).ok_or_else(empty)?,
    };
    if clamped != *window {
        warn!(
            "Index window lon {:?} lat {:?} exceeds the lattice, clamped to lon {:?} lat {:?}",
            window.lon_range, window.lat_range, clamped.lon_range, clamped.lat_range
        );
    }
    Ok(clamped)
}

#[async_trait]
impl ForecastDataProvider for NomadsProvider {
    fn lattice(&self) -> Lattice {
        self.lattice
    }

    async fn model_runs(&self, model_id: &str) -> Result<Vec<ModelRun>, ProviderError> {
        let listing_url = format!("{}/{}", self.base_url, model_id);
        let days = parse_day_listing(&self.get_text(&listing_url).await?, model_id);
        debug!("Found {} day directories for {}", days.len(), model_id);

        let mut runs = Vec::new();
        for date in days_to_scan(&days) {
            let day_dir = ModelRun::new(*date, 0).day_dir(model_id);
            let day_url = format!("{}/{}/{}", self.base_url, model_id, day_dir);
            let listing = self.get_text(&day_url).await?;
            runs.extend(
                parse_cycle_listing(&listing, model_id)
                    .into_iter()
                    .map(|cycle| ModelRun::new(*date, cycle)),
            );
        }
        runs.sort();
        Ok(runs)
    }

    async fn available_steps(
        &self,
        model_id: &str,
        model_run_id: &str,
    ) -> Result<Vec<ForecastStep>, ProviderError> {
        let url = format!("{}/{}/{}.dds", self.base_url, model_id, model_run_id);
        let dds = self.get_text(&url).await?;
        let count = parse_time_dimension(&dds).ok_or_else(|| ProviderError::MalformedResponse {
            url: url.clone(),
            message: "no time dimension in dataset description".to_string(),
        })?;
        let count = u32::try_from(count).map_err(|_| ProviderError::MalformedResponse {
            url: url.clone(),
            message: format!("time dimension of {} steps is out of range", count),
        })?;
        Ok((0..count).map(ForecastStep).collect())
    }

    async fn fetch(&self, request: &ForecastRequest) -> Result<ForecastGrid, ProviderError> {
        if let Some(cache) = &self.cache {
            if let Some(grid) = cache.load(request).await? {
                return Ok(grid);
            }
        }

        let window = clamp_window(&request.index_window(), &self.lattice)?;
        let url = self.window_url(request, &window);
        let body = self.get_text(&url).await?;
        let grid = parse_ascii_grid(&body, request.variable()).map_err(|message| {
            ProviderError::MalformedResponse {
                url: url.clone(),
                message,
            }
        })?;
        let expected = [request.step_count(), window.lat_len(), window.lon_len()];
        if grid.shape() != expected {
            return Err(ProviderError::MalformedResponse {
                url,
                message: format!("expected shape {:?}, got {:?}", expected, grid.shape()),
            });
        }
        info!(
            "Fetched {} with shape {:?} from {}",
            request.variable(),
            grid.shape(),
            url
        );

        if let Some(cache) = &self.cache {
            cache.store(request, &grid).await?;
        }
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::lat_lon::LatLon;
    use axum::extract::Path;
    use axum::routing::get;
    use axum::Router;

    const DAY_LISTING: &str = r#"<html><body>
<a href="/dods/gfs_0p50/gfs20240113">gfs20240113</a><br>
<a href="/dods/gfs_0p50/gfs20240115">gfs20240115</a><br>
<a href="/dods/gfs_0p50/gfs20240114">gfs20240114</a><br>
</body></html>"#;

    const DDS: &str = "Dataset {
    Grid {
     ARRAY:
        Float32 apcpsfc[time = 129][lat = 361][lon = 720];
    } apcpsfc;
} gfs_0p50_00z;";

    /// A DODS ASCII body of the given shape, every value set to `value`.
    fn ascii_body(nt: usize, ny: usize, nx: usize, value: f64) -> String {
        let mut body = format!("apcpsfc, [{}][{}][{}]\n", nt, ny, nx);
        let row = vec![value.to_string(); nx].join(", ");
        for t in 0..nt {
            for y in 0..ny {
                body.push_str(&format!("[{}][{}], {}\n", t, y, row));
            }
        }
        let axis = |n: usize, start: f64| {
            (0..n)
                .map(|i| (start + i as f64 * 0.5).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        body.push_str(&format!("\ntime, [{}]\n{}\n", nt, axis(nt, 738901.0)));
        body.push_str(&format!("lat, [{}]\n{}\n", ny, axis(ny, -27.0)));
        body.push_str(&format!("lon, [{}]\n{}\n", nx, axis(nx, 302.0)));
        body
    }

    fn cycle_listing(day: &str) -> String {
        let cycles: &[&str] = match day {
            "gfs20240113" => &["00"],
            "gfs20240114" => &["18", "00", "12", "06"],
            "gfs20240115" => &["06", "00"],
            _ => &[],
        };
        cycles
            .iter()
            .map(|c| format!("<b>gfs_0p50_{}z:</b>&nbsp;<a href=\"/dods/gfs_0p50/{}/gfs_0p50_{}z.info\">info</a>\n", c, day, c))
            .collect()
    }

    /// Serves canned NOMADS responses on a local port and returns its base URL.
    async fn serve_nomads_stub() -> String {
        let app = Router::new()
            .route("/gfs_0p50", get(|| async { DAY_LISTING.to_string() }))
            .route(
                "/gfs_0p50/:day",
                get(|Path(day): Path<String>| async move { cycle_listing(&day) }),
            )
            .route(
                "/gfs_0p50/:day/:dataset",
                get(|Path((_day, dataset)): Path<(String, String)>| async move {
                    match dataset.as_str() {
                        "gfs_0p50_00z.dds" => DDS.to_string(),
                        "gfs_0p50_18z.dds" => DDS.replace("time = 129", "time = 4294967296"),
                        // 6 hours ahead: 3 steps of a 29 x 25 window
                        "gfs_0p50_00z.ascii" => ascii_body(3, 29, 25, 0.5),
                        "gfs_0p50_06z.ascii" => ascii_body(2, 2, 3, 0.5),
                        _ => String::new(),
                    }
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{}", addr)
    }

    fn short_request(run_id: &str) -> ForecastRequest {
        ForecastRequest::builder()
            .model_id("gfs_0p50")
            .model_run_id(run_id)
            .variable("apcpsfc")
            .horizon(6.0)
            .poi(LatLon(-19.78753, -51.98899))
            .build()
            .unwrap()
    }

    #[test]
    fn test_days_to_scan() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        assert_eq!(days_to_scan(&[day(13), day(14), day(15)]), &[day(14), day(15)]);
        assert_eq!(days_to_scan(&[day(15)]), &[day(15)]);
        assert!(days_to_scan(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_model_runs_from_listings() -> Result<(), ProviderError> {
        let provider = NomadsProvider::builder()
            .base_url(serve_nomads_stub().await)
            .build()?;

        let runs = provider.model_runs("gfs_0p50").await?;
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        assert_eq!(
            runs,
            vec![
                ModelRun::new(day(14), 0),
                ModelRun::new(day(14), 6),
                ModelRun::new(day(14), 12),
                ModelRun::new(day(14), 18),
                ModelRun::new(day(15), 0),
                ModelRun::new(day(15), 6),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_available_steps_from_dds() -> Result<(), ProviderError> {
        let provider = NomadsProvider::builder()
            .base_url(serve_nomads_stub().await)
            .build()?;

        let steps = provider
            .available_steps("gfs_0p50", "gfs20240115/gfs_0p50_00z")
            .await?;
        assert_eq!(steps.len(), 129);
        assert_eq!(steps.last(), Some(&ForecastStep(128)));

        assert!(matches!(
            provider
                .available_steps("gfs_0p50", "gfs20240115/gfs_0p50_12z")
                .await,
            Err(ProviderError::MalformedResponse { .. })
        ));
        // one step more than a u32 can count
        assert!(matches!(
            provider
                .available_steps("gfs_0p50", "gfs20240115/gfs_0p50_18z")
                .await,
            Err(ProviderError::MalformedResponse { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_checks_the_window_shape() -> Result<(), ProviderError> {
        let provider = NomadsProvider::builder()
            .base_url(serve_nomads_stub().await)
            .build()?;

        let grid = provider
            .fetch(&short_request("gfs20240115/gfs_0p50_00z"))
            .await?;
        assert_eq!(grid.shape(), [3, 29, 25]);
        assert_eq!(grid.value(2, 28, 24), Some(0.5));

        assert!(matches!(
            provider
                .fetch(&short_request("gfs20240115/gfs_0p50_06z"))
                .await,
            Err(ProviderError::MalformedResponse { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_prefers_the_cache() -> Result<(), ProviderError> {
        let dir = tempfile::tempdir().expect("temp dir");
        let request = short_request("gfs20240115/gfs_0p50_00z");
        let cached = parse_ascii_grid(&ascii_body(3, 29, 25, 1.5), "apcpsfc").unwrap();
        SubsetCache::new(dir.path()).store(&request, &cached).await?;

        // nothing listens on the discard port
        let offline = NomadsProvider::builder()
            .base_url("http://127.0.0.1:9")
            .cache_dir(dir.path().to_path_buf())
            .build()?;
        assert_eq!(offline.fetch(&request).await?, cached);

        let missing = short_request("gfs20240115/gfs_0p50_18z");
        assert!(matches!(
            offline.fetch(&missing).await,
            Err(ProviderError::NetworkRequest(..))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_fills_the_cache() -> Result<(), ProviderError> {
        let dir = tempfile::tempdir().expect("temp dir");
        let online = NomadsProvider::builder()
            .base_url(serve_nomads_stub().await)
            .cache_dir(dir.path().to_path_buf())
            .build()?;
        let request = short_request("gfs20240115/gfs_0p50_00z");
        let fetched = online.fetch(&request).await?;
        assert!(online.cache().unwrap().path_for(&request).exists());

        let offline = NomadsProvider::builder()
            .base_url("http://127.0.0.1:9")
            .cache_dir(dir.path().to_path_buf())
            .build()?;
        assert_eq!(offline.fetch(&request).await?, fetched);
        Ok(())
    }

    fn request(poi: LatLon) -> ForecastRequest {
        ForecastRequest::builder()
            .model_id("gfs_0p50")
            .model_run_id("gfs20240115/gfs_0p50_00z")
            .variable("apcpsfc")
            .horizon(348.0)
            .poi(poi)
            .build()
            .unwrap()
    }

    #[test]
    fn test_subset_url() {
        let provider = NomadsProvider::builder().build().unwrap();
        let url = provider
            .subset_url(&request(LatLon(-19.78753, -51.98899)))
            .unwrap();
        assert_eq!(
            url,
            "https://nomads.ncep.noaa.gov/dods/gfs_0p50/gfs20240115/gfs_0p50_00z.ascii?apcpsfc[0:116][126:154][604:628]"
        );

        let custom = NomadsProvider::builder()
            .base_url("http://localhost:9090/dods/")
            .build()
            .unwrap();
        assert!(custom
            .subset_url(&request(LatLon(0.0, 10.0)))
            .unwrap()
            .starts_with("http://localhost:9090/dods/gfs_0p50/"));
    }

    #[test]
    fn test_subset_url_clamps_at_the_edges() {
        let provider = NomadsProvider::builder().build().unwrap();
        let url = provider.subset_url(&request(LatLon(89.0, 0.2))).unwrap();
        assert!(url.ends_with("apcpsfc[0:116][344:360][0:12]"), "{}", url);
    }

    #[test]
    fn test_clamp_window() {
        let lattice = Lattice::default();
        let inside = IndexWindow {
            lon_range: [604, 628],
            lat_range: [126, 154],
        };
        assert_eq!(clamp_window(&inside, &lattice).unwrap(), inside);

        let edge = IndexWindow {
            lon_range: [710, 734],
            lat_range: [-5, 10],
        };
        let clamped = clamp_window(&edge, &lattice).unwrap();
        assert_eq!(clamped.lon_range, [710, 719]);
        assert_eq!(clamped.lat_range, [0, 10]);

        let outside = IndexWindow {
            lon_range: [800, 820],
            lat_range: [0, 10],
        };
        assert!(matches!(
            clamp_window(&outside, &lattice),
            Err(ProviderError::EmptyWindow { .. })
        ));
    }

    #[tokio::test]
    #[ignore = "requires network access to nomads.ncep.noaa.gov"]
    async fn test_live_latest_run() -> Result<(), ProviderError> {
        let provider = NomadsProvider::builder().build()?;
        let runs = provider.model_runs("gfs_0p50").await?;
        let latest = runs.last().expect("NOMADS lists at least one run");
        let run_id = latest.run_id("gfs_0p50");
        let steps = provider.available_steps("gfs_0p50", &run_id).await?;
        assert!(!steps.is_empty());

        let request = ForecastRequest::builder()
            .model_id("gfs_0p50")
            .model_run_id(&run_id)
            .variable("apcpsfc")
            .horizon(24.0)
            .poi(LatLon(-19.78753, -51.98899))
            .build()
            .expect("valid request");
        let grid = provider.fetch(&request).await?;
        assert_eq!(grid.shape(), [9, 29, 25]);
        Ok(())
    }
}
