pub mod access;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod types;

#[cfg(feature = "risk")]
pub mod risk;

#[cfg(feature = "monitoring")]
pub mod engine;

#[cfg(feature = "monitoring")]
pub mod store;

pub use error::NavMonitorError;

pub type NavMonitorResult<T> = Result<T, NavMonitorError>;
