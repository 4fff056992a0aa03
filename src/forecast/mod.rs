pub mod error;
pub mod horizon;
pub mod request;
