//! demos/precip_heatmap.rs
//!
//! Fetches the latest GFS precipitation window around a point and shows the
//! accumulated total per grid cell as a heat map.
//!
//! To run this demo:
//! cargo run --example precip_heatmap --features demos

use std::error::Error;

use gfs_window::{
    bucket_steps, LatLon, NomadsClient, DEFAULT_SAMPLING_INTERVAL_HOURS, GFS_PRECIP_BUCKET_HOURS,
};
use plotlars::{HeatMap, Plot, Text};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let client = NomadsClient::nomads().call().await?;

    let request = client
        .request()
        .poi(LatLon(-19.78753, -51.98899))
        .hours(72.0)
        .call()
        .await?;
    println!("Fetching {}", request);

    let total = client
        .fetch(&request)
        .await?
        .accumulated(bucket_steps(GFS_PRECIP_BUCKET_HOURS, DEFAULT_SAMPLING_INTERVAL_HOURS));
    let data = total.to_dataframe()?;

    HeatMap::builder()
        .data(&data)
        .x("lon")
        .y("lat")
        .z("value")
        .plot_title(Text::from(format!("{} next 72h", request.variable())).size(18))
        .x_title("lon")
        .y_title("lat")
        .build()
        .plot();

    Ok(())
}
