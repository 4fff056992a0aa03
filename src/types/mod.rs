pub mod grid_data;
pub mod lat_lon;
pub mod model_run;
