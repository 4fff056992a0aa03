//! Parsers for the plain-text responses of a GrADS Data Server (DODS/OPeNDAP):
//! directory listings, `.dds` structure descriptions and `.ascii` data subsets.

use crate::types::grid_data::ForecastGrid;
use crate::types::model_run::model_prefix;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// GrADS marks missing values with 9.999e20.
const FILL_VALUE: f64 = 9.999e20;

static TIME_DIMENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[time = (\d+)\]").expect("valid time dimension pattern"));

/// Extracts the day directories (`gfs20240115`, ...) linked from a model listing,
/// sorted ascending without duplicates.
pub fn parse_day_listing(listing: &str, model_id: &str) -> Vec<NaiveDate> {
    let prefix = regex::escape(model_prefix(model_id));
    let Ok(re) = Regex::new(&format!(r"\b{}(\d{{8}})\b", prefix)) else {
        return Vec::new();
    };
    let mut days: Vec<NaiveDate> = re
        .captures_iter(listing)
        .filter_map(|cap| NaiveDate::parse_from_str(&cap[1], "%Y%m%d").ok())
        .collect();
    days.sort();
    days.dedup();
    days
}

/// Extracts the cycle hours (`gfs_0p50_06z` -> 6) linked from a day listing,
/// sorted ascending without duplicates.
pub fn parse_cycle_listing(listing: &str, model_id: &str) -> Vec<u8> {
    let Ok(re) = Regex::new(&format!(r"\b{}_(\d{{2}})z\b", regex::escape(model_id))) else {
        return Vec::new();
    };
    let mut cycles: Vec<u8> = re
        .captures_iter(listing)
        .filter_map(|cap| cap[1].parse::<u8>().ok())
        .filter(|hour| *hour < 24)
        .collect();
    cycles.sort();
    cycles.dedup();
    cycles
}

/// Reads the size of the `time` dimension from a `.dds` description, e.g.
/// `Float32 apcpsfc[time = 129][lat = 361][lon = 720];`.
pub fn parse_time_dimension(dds: &str) -> Option<usize> {
    TIME_DIMENSION
        .captures(dds)
        .and_then(|cap| cap[1].parse().ok())
}

fn parse_values(line: &str) -> Result<Vec<f64>, String> {
    line.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<f64>()
                .map(|value| if value >= FILL_VALUE * 0.999 { f64::NAN } else { value })
                .map_err(|_| format!("'{}' is not a number", v))
        })
        .collect()
}

/// Parses a `name, [a][b]...` header into its name and dimension sizes.
fn parse_header(line: &str) -> Option<(&str, Vec<usize>)> {
    let (name, dims) = line.split_once(',')?;
    let dims = dims.trim();
    if !dims.starts_with('[') || !dims.ends_with(']') {
        return None;
    }
    let sizes = dims[1..dims.len() - 1]
        .split("][")
        .map(|d| d.trim().parse::<usize>().ok())
        .collect::<Option<Vec<_>>>()?;
    Some((name.trim(), sizes))
}

/// Parses an `.ascii` response for a `[time][lat][lon]` subset of `variable`.
///
/// The body holds the data block (a `variable, [T][Y][X]` header followed by
/// `[t][y], v, v, ...` rows) and then one block per coordinate (`time, [T]`,
/// `lat, [Y]`, `lon, [X]`, each followed by its values). Fill values become `NaN`.
pub fn parse_ascii_grid(body: &str, variable: &str) -> Result<ForecastGrid, String> {
    let mut lines = body.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();

    let header = lines
        .next()
        .ok_or_else(|| "response is empty".to_string())?;
    let (name, dims) =
        parse_header(header).ok_or_else(|| format!("unexpected header '{}'", header))?;
    if name != variable {
        return Err(format!("expected variable '{}', found '{}'", variable, name));
    }
    let &[nt, ny, nx] = dims.as_slice() else {
        return Err(format!("expected 3 dimensions, found {}", dims.len()));
    };
    // every value takes at least one byte of the body
    let expected = nt
        .checked_mul(ny)
        .and_then(|n| n.checked_mul(nx))
        .filter(|n| *n <= body.len())
        .ok_or_else(|| format!("shape [{}][{}][{}] cannot fit a {} byte body", nt, ny, nx, body.len()))?;

    let mut values = Vec::new();
    while let Some(line) = lines.next_if(|l| l.starts_with('[')) {
        let (_, row) = line
            .split_once(',')
            .ok_or_else(|| format!("data row without values: '{}'", line))?;
        let row = parse_values(row)?;
        if row.len() != nx {
            return Err(format!("data row has {} values, expected {}", row.len(), nx));
        }
        if values.len() + row.len() > expected {
            return Err(format!("data block has more than {} values", expected));
        }
        values.extend(row);
    }
    if values.len() != expected {
        return Err(format!(
            "data block has {} values, expected {}",
            values.len(),
            expected
        ));
    }

    let (mut time, mut lat, mut lon) = (None, None, None);
    while let Some(line) = lines.next() {
        let (name, dims) =
            parse_header(line).ok_or_else(|| format!("unexpected line '{}'", line))?;
        let &[len] = dims.as_slice() else {
            return Err(format!("coordinate '{}' is not one-dimensional", name));
        };
        if len > body.len() {
            return Err(format!("coordinate '{}' of length {} cannot fit the body", name, len));
        }
        let mut coords = Vec::new();
        while coords.len() < len {
            let line = lines
                .next()
                .ok_or_else(|| format!("coordinate '{}' is truncated", name))?;
            coords.extend(parse_values(line)?);
        }
        if coords.len() != len {
            return Err(format!(
                "coordinate '{}' has {} values, expected {}",
                name,
                coords.len(),
                len
            ));
        }
        match name {
            "time" => time = Some(coords),
            "lat" => lat = Some(coords),
            "lon" => lon = Some(coords),
            _ => {}
        }
    }

    let (Some(time), Some(lat), Some(lon)) = (time, lat, lon) else {
        return Err("response is missing a time, lat or lon coordinate".to_string());
    };
    if time.len() != nt || lat.len() != ny || lon.len() != nx {
        return Err("coordinate lengths do not match the data block".to_string());
    }

    ForecastGrid::new(variable, time, lat, lon, values).map_err(|e| e.to_string())
}
