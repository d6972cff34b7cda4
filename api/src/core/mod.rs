pub mod app_state;
pub mod http;
pub mod telemetry;
