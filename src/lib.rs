pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod probe;
pub mod retry;
pub mod telemetry;
