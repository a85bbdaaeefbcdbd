pub mod access;
pub mod covenants;
pub mod monitor;
pub mod risk;
