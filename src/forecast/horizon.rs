//! Converts forecast horizons (hours ahead) into the provider's discrete time-step indices.

use crate::forecast::error::ForecastError;
use crate::types::model_run::ModelRun;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling interval of the GFS products served through NOMADS, in hours.
pub const DEFAULT_SAMPLING_INTERVAL_HOURS: f64 = 3.0;

/// A non-negative index into a model run's sequence of forecast times.
///
/// Step `0` is the analysis time of the run ("now" from the run's point of view).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ForecastStep(pub u32);

impl ForecastStep {
    pub const ANALYSIS: ForecastStep = ForecastStep(0);

    pub fn index(&self) -> u32 {
        self.0
    }

    /// Hours after the run start this step represents, given the sampling interval.
    pub fn hours(&self, sampling_interval_hours: f64) -> f64 {
        self.0 as f64 * sampling_interval_hours
    }
}

impl fmt::Display for ForecastStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How far ahead a request should reach.
#[derive(Debug, Clone, PartialEq)]
pub enum Horizon {
    /// An explicit number of hours after the model run start.
    Hours(f64),
    /// The last step of the given ordered sequence of available steps.
    Latest(Vec<ForecastStep>),
}

impl Horizon {
    /// Resolves this horizon to a step using `sampling_interval_hours` for explicit hours.
    pub fn resolve(&self, sampling_interval_hours: f64) -> Result<ForecastStep, ForecastError> {
        match self {
            Horizon::Hours(hours) => step_for_horizon(*hours, sampling_interval_hours),
            Horizon::Latest(steps) => latest_available_step(steps),
        }
    }
}

impl From<f64> for Horizon {
    fn from(hours: f64) -> Self {
        Horizon::Hours(hours)
    }
}

/// Converts `hours_ahead` into a step index: `floor(hours_ahead / sampling_interval_hours)`.
///
/// ```
/// use gfs_window::step_for_horizon;
///
/// assert_eq!(step_for_horizon(24.0, 3.0).unwrap().index(), 8);
/// assert_eq!(step_for_horizon(348.0, 3.0).unwrap().index(), 116);
/// assert_eq!(step_for_horizon(5.9, 3.0).unwrap().index(), 1);
/// ```
///
/// # Errors
///
/// Returns [`ForecastError::InvalidHorizon`] if `hours_ahead` is negative or not
/// finite, if the interval is not a positive finite number, or if the resulting
/// step does not fit a `u32`.
pub fn step_for_horizon(
    hours_ahead: f64,
    sampling_interval_hours: f64,
) -> Result<ForecastStep, ForecastError> {
    if !hours_ahead.is_finite() || hours_ahead < 0.0 {
        return Err(ForecastError::InvalidHorizon(format!(
            "horizon must be a non-negative number of hours, got {}",
            hours_ahead
        )));
    }
    if !sampling_interval_hours.is_finite() || sampling_interval_hours <= 0.0 {
        return Err(ForecastError::InvalidHorizon(format!(
            "sampling interval must be a positive number of hours, got {}",
            sampling_interval_hours
        )));
    }

    let step = (hours_ahead / sampling_interval_hours).floor();
    if step > u32::MAX as f64 {
        return Err(ForecastError::InvalidHorizon(format!(
            "horizon of {} hours is beyond any forecast step",
            hours_ahead
        )));
    }
    Ok(ForecastStep(step as u32))
}

/// Returns the last entry of an ordered sequence of available steps.
///
/// # Errors
///
/// Returns [`ForecastError::InvalidHorizon`] if `steps` is empty.
pub fn latest_available_step(steps: &[ForecastStep]) -> Result<ForecastStep, ForecastError> {
    steps.last().copied().ok_or_else(|| {
        ForecastError::InvalidHorizon("no forecast steps are available".to_string())
    })
}

/// Returns the most recent entry of an ordered run listing for `model_id`.
///
/// # Errors
///
/// Returns [`ForecastError::NoModelRuns`] if `runs` is empty.
pub fn latest_model_run(model_id: &str, runs: &[ModelRun]) -> Result<ModelRun, ForecastError> {
    runs.last()
        .copied()
        .ok_or_else(|| ForecastError::NoModelRuns(model_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_horizons() {
        assert_eq!(step_for_horizon(24.0, 3.0), Ok(ForecastStep(8)));
        assert_eq!(step_for_horizon(348.0, 3.0), Ok(ForecastStep(116)));
        assert_eq!(step_for_horizon(0.0, 3.0), Ok(ForecastStep::ANALYSIS));
        assert_eq!(step_for_horizon(2.99, 3.0), Ok(ForecastStep(0)));
        assert_eq!(step_for_horizon(7.0, 6.0), Ok(ForecastStep(1)));
    }

    #[test]
    fn test_matches_floor_division() {
        for interval in [1.0, 3.0, 6.0, 0.5] {
            let mut hours = 0.0;
            while hours < 400.0 {
                let step = step_for_horizon(hours, interval).unwrap();
                assert_eq!(step.index(), (hours / interval).floor() as u32);
                hours += 1.7;
            }
        }
    }

    #[test]
    fn test_invalid_horizons() {
        for hours in [-1.0, -0.001, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(
                matches!(
                    step_for_horizon(hours, 3.0),
                    Err(ForecastError::InvalidHorizon(_))
                ),
                "{} hours should be rejected",
                hours
            );
        }
        assert!(matches!(
            step_for_horizon(24.0, 0.0),
            Err(ForecastError::InvalidHorizon(_))
        ));
        assert!(matches!(
            step_for_horizon(24.0, -3.0),
            Err(ForecastError::InvalidHorizon(_))
        ));
        assert!(matches!(
            step_for_horizon(1e12, 1.0),
            Err(ForecastError::InvalidHorizon(_))
        ));
    }

    #[test]
    fn test_latest_available_step() {
        let steps: Vec<ForecastStep> = (0..=128).map(ForecastStep).collect();
        assert_eq!(latest_available_step(&steps), Ok(ForecastStep(128)));
        assert!(matches!(
            latest_available_step(&[]),
            Err(ForecastError::InvalidHorizon(_))
        ));
    }

    #[test]
    fn test_latest_model_run() {
        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let runs = [ModelRun::new(day, 0), ModelRun::new(day, 6)];
        assert_eq!(latest_model_run("gfs_0p50", &runs), Ok(ModelRun::new(day, 6)));
        assert_eq!(
            latest_model_run("gfs_0p50", &[]),
            Err(ForecastError::NoModelRuns("gfs_0p50".to_string()))
        );
    }

    #[test]
    fn test_horizon_resolution() {
        assert_eq!(Horizon::from(24.0).resolve(3.0), Ok(ForecastStep(8)));
        assert_eq!(
            Horizon::Latest(vec![ForecastStep(0), ForecastStep(40)]).resolve(3.0),
            Ok(ForecastStep(40))
        );
        assert_eq!(ForecastStep(116).hours(3.0), 348.0);
    }
}
