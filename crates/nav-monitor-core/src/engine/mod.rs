//! Async monitoring engine: batch covenant evaluation, breach/warning
//! notification fan-out, and the periodic job scheduler.
//!
//! Everything here runs against the [`crate::store::PortfolioStore`] seam;
//! the pure evaluation and risk math it drives lives in `evaluator` and
//! `risk`.

pub mod driver;
pub mod notify;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support;

pub use driver::{BatchEvaluationDriver, CovenantCheck, SweepMode, SweepReport};
pub use notify::{plan_notifications, StatusTransition};
pub use scheduler::{next_fire, JobSchedule, JobSpec, MonitorScheduler};
