//! Identifies a single execution of a forecast model by its start date and cycle hour.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A model run, e.g. the 06z GFS run of 2024-01-15.
///
/// Runs order chronologically (date first, then cycle hour).
///
/// # Examples
///
/// ```
/// use gfs_window::ModelRun;
/// use chrono::NaiveDate;
///
/// let run = ModelRun::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), 6);
/// assert_eq!(run.run_id("gfs_0p50"), "gfs20240115/gfs_0p50_06z");
/// assert_eq!(ModelRun::parse_run_id("gfs_0p50", "gfs20240115/gfs_0p50_06z"), Some(run));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelRun {
    pub date: NaiveDate,
    pub cycle: u8,
}

impl ModelRun {
    pub fn new(date: NaiveDate, cycle: u8) -> Self {
        Self { date, cycle }
    }

    /// Start time of the run.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.date
            .and_hms_opt(self.cycle as u32, 0, 0)
            .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
    }

    /// The day directory this run lives in, e.g. `gfs20240115`.
    pub fn day_dir(&self, model_id: &str) -> String {
        format!("{}{}", model_prefix(model_id), self.date.format("%Y%m%d"))
    }

    /// The dataset name of this run within its day directory, e.g. `gfs_0p50_06z`.
    pub fn dataset(&self, model_id: &str) -> String {
        format!("{}_{:02}z", model_id, self.cycle)
    }

    /// Full run identifier, `{day_dir}/{dataset}`.
    pub fn run_id(&self, model_id: &str) -> String {
        format!("{}/{}", self.day_dir(model_id), self.dataset(model_id))
    }

    /// Inverse of [`ModelRun::run_id`].
    pub fn parse_run_id(model_id: &str, run_id: &str) -> Option<Self> {
        let (day, dataset) = run_id.split_once('/')?;
        let date = parse_day_dir(model_id, day)?;
        let cycle = parse_dataset(model_id, dataset)?;
        Some(Self { date, cycle })
    }
}

impl fmt::Display for ModelRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}z", self.date, self.cycle)
    }
}

/// The family prefix of a model id: `gfs_0p50` -> `gfs`.
pub(crate) fn model_prefix(model_id: &str) -> &str {
    model_id.split('_').next().unwrap_or(model_id)
}

/// Parses a day directory name such as `gfs20240115`.
pub(crate) fn parse_day_dir(model_id: &str, name: &str) -> Option<NaiveDate> {
    let digits = name.strip_prefix(model_prefix(model_id))?;
    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

/// Parses a dataset name such as `gfs_0p50_06z` into its cycle hour.
pub(crate) fn parse_dataset(model_id: &str, name: &str) -> Option<u8> {
    let hour = name
        .strip_prefix(model_id)?
        .strip_prefix('_')?
        .strip_suffix('z')?;
    if hour.len() != 2 {
        return None;
    }
    hour.parse::<u8>().ok().filter(|h| *h < 24)
}
