//! Batch covenant evaluation.
//!
//! The driver walks a covenant selection, resolves each covenant's current
//! value from its configured source, evaluates it, persists the outcome,
//! and fans out notifications. One covenant failing never aborts the
//! sweep: the failure is logged, recorded in the report, and the sweep
//! moves on.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::MonitorConfig;
use crate::engine::notify::{plan_notifications, StatusTransition};
use crate::error::NavMonitorError;
use crate::evaluator;
use crate::model::{Covenant, CovenantSource, CovenantStatus, Facility, Role, User};
use crate::store::PortfolioStore;
use crate::types::{CovenantId, FacilityId};
use crate::NavMonitorResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which covenants a sweep covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// Covenants whose `next_check` has come due.
    Due,
    /// Every covenant, regardless of schedule. Manual sweeps only; the
    /// scheduler never uses it.
    All,
    /// Due covenants, but the report keeps only new breaches and fresh
    /// warning entries. Used by the intraday sweep.
    Urgent,
}

/// Outcome of checking one covenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovenantCheck {
    pub covenant_id: CovenantId,
    pub facility_id: FacilityId,
    pub name: String,
    pub previous_status: CovenantStatus,
    pub status: CovenantStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<Decimal>,
    pub breached: bool,
    /// True when the covenant's value source had nothing to measure; the
    /// stored record was left untouched.
    pub value_missing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepFailure {
    pub covenant_id: CovenantId,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub mode: SweepMode,
    pub started_at: DateTime<Utc>,
    pub total_checked: usize,
    pub breaches_detected: usize,
    pub warnings: usize,
    pub skipped: usize,
    pub notifications_created: usize,
    pub results: Vec<CovenantCheck>,
    pub failures: Vec<SweepFailure>,
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct BatchEvaluationDriver<S: PortfolioStore> {
    store: Arc<S>,
    config: MonitorConfig,
}

impl<S: PortfolioStore> BatchEvaluationDriver<S> {
    pub fn new(store: Arc<S>, config: MonitorConfig) -> Self {
        BatchEvaluationDriver { store, config }
    }

    /// Run one sweep at `now`.
    pub async fn run(&self, now: DateTime<Utc>, mode: SweepMode) -> NavMonitorResult<SweepReport> {
        let covenants = match mode {
            SweepMode::Due | SweepMode::Urgent => self.store.covenants_due(now).await?,
            SweepMode::All => self.store.covenants().await?,
        };
        let staff = self
            .store
            .users_with_roles(&[Role::Admin, Role::Operations])
            .await?;

        let mut report = SweepReport {
            mode,
            started_at: now,
            total_checked: 0,
            breaches_detected: 0,
            warnings: 0,
            skipped: 0,
            notifications_created: 0,
            results: Vec::new(),
            failures: Vec::new(),
        };

        for covenant in covenants {
            let covenant_id = covenant.id;
            match self.process_one(covenant, &staff, now).await {
                Ok((check, created)) => {
                    report.total_checked += 1;
                    report.notifications_created += created;
                    match check.status {
                        CovenantStatus::Breach if !check.value_missing => {
                            report.breaches_detected += 1
                        }
                        CovenantStatus::Warning if !check.value_missing => report.warnings += 1,
                        _ => {}
                    }
                    if check.value_missing {
                        report.skipped += 1;
                    }
                    report.results.push(check);
                }
                Err(err) => {
                    warn!(covenant = %covenant_id, error = %err, "covenant check failed");
                    report.failures.push(SweepFailure {
                        covenant_id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if mode == SweepMode::Urgent {
            report.results.retain(|c| {
                (c.status == CovenantStatus::Breach && c.previous_status != CovenantStatus::Breach)
                    || (c.status == CovenantStatus::Warning
                        && c.previous_status == CovenantStatus::Compliant)
            });
        }

        info!(
            mode = ?report.mode,
            checked = report.total_checked,
            breaches = report.breaches_detected,
            warnings = report.warnings,
            skipped = report.skipped,
            failures = report.failures.len(),
            notifications = report.notifications_created,
            "covenant sweep finished"
        );
        Ok(report)
    }

    /// Check a single covenant by id.
    pub async fn check_covenant(
        &self,
        id: CovenantId,
        now: DateTime<Utc>,
    ) -> NavMonitorResult<CovenantCheck> {
        let covenant = self
            .store
            .covenant(id)
            .await?
            .ok_or_else(|| NavMonitorError::NotFound {
                entity: "covenant".into(),
                id,
            })?;
        let staff = self
            .store
            .users_with_roles(&[Role::Admin, Role::Operations])
            .await?;
        let (check, _) = self.process_one(covenant, &staff, now).await?;
        Ok(check)
    }

    /// Check every covenant attached to one facility.
    pub async fn check_facility(
        &self,
        facility_id: FacilityId,
        now: DateTime<Utc>,
    ) -> NavMonitorResult<Vec<CovenantCheck>> {
        if self.store.facility(facility_id).await?.is_none() {
            return Err(NavMonitorError::NotFound {
                entity: "facility".into(),
                id: facility_id,
            });
        }
        let covenants = self.store.covenants_for_facility(facility_id).await?;
        let staff = self
            .store
            .users_with_roles(&[Role::Admin, Role::Operations])
            .await?;
        let mut checks = Vec::with_capacity(covenants.len());
        for covenant in covenants {
            let (check, _) = self.process_one(covenant, &staff, now).await?;
            checks.push(check);
        }
        Ok(checks)
    }

    /// Post an operator-measured value against a manual-source covenant
    /// and evaluate it immediately.
    pub async fn record_manual_value(
        &self,
        id: CovenantId,
        value: Decimal,
        now: DateTime<Utc>,
    ) -> NavMonitorResult<CovenantCheck> {
        let mut covenant = self
            .store
            .covenant(id)
            .await?
            .ok_or_else(|| NavMonitorError::NotFound {
                entity: "covenant".into(),
                id,
            })?;
        if covenant.source != CovenantSource::Manual {
            return Err(NavMonitorError::InvalidInput {
                field: "covenant".into(),
                reason: "manual values can only be posted to manual-source covenants".into(),
            });
        }
        covenant.current_value = Some(value);
        let staff = self
            .store
            .users_with_roles(&[Role::Admin, Role::Operations])
            .await?;
        let (check, _) = self.process_one(covenant, &staff, now).await?;
        Ok(check)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn process_one(
        &self,
        covenant: Covenant,
        staff: &[User],
        now: DateTime<Utc>,
    ) -> NavMonitorResult<(CovenantCheck, usize)> {
        let facility = self
            .store
            .facility(covenant.facility_id)
            .await?
            .ok_or_else(|| NavMonitorError::EvaluationFailure {
                covenant: covenant.id,
                reason: format!("facility {} not found", covenant.facility_id),
            })?;

        let value = match resolve_value(&covenant, &facility) {
            Some(v) => v,
            // Nothing to measure: leave the record untouched and report
            // the covenant as skipped.
            None => {
                return Ok((
                    CovenantCheck {
                        covenant_id: covenant.id,
                        facility_id: covenant.facility_id,
                        name: covenant.name,
                        previous_status: covenant.status,
                        status: covenant.status,
                        current_value: None,
                        breached: false,
                        value_missing: true,
                    },
                    0,
                ));
            }
        };

        let evaluation = evaluator::evaluate(
            covenant.operator,
            covenant.threshold,
            value,
            self.config.warning_band,
        );
        let previous_status = covenant.status;
        let breach_already_notified = covenant.breach_notified;

        let mut updated = covenant.clone();
        updated.current_value = Some(value);
        updated.status = evaluation.status;
        updated.last_checked = Some(now);
        updated.next_check = now + covenant.check_frequency.period();
        updated.updated_at = now;
        if evaluation.status == CovenantStatus::Compliant {
            updated.breach_notified = false;
        }
        self.store.update_covenant(updated.clone()).await?;

        let transition = StatusTransition {
            from: previous_status,
            to: evaluation.status,
        };
        let plans = plan_notifications(
            &updated,
            &facility,
            transition,
            breach_already_notified,
            value,
            staff,
            now,
        );
        let created = plans.len();
        let is_breach_fanout = transition.needs_breach_alert(breach_already_notified);
        for notification in plans {
            self.store.insert_notification(notification).await?;
        }
        // Only flip the at-most-once flag once the alerts are durable.
        if is_breach_fanout && created > 0 {
            updated.breach_notified = true;
            self.store.update_covenant(updated.clone()).await?;
        }

        Ok((
            CovenantCheck {
                covenant_id: updated.id,
                facility_id: updated.facility_id,
                name: updated.name,
                previous_status,
                status: evaluation.status,
                current_value: Some(value),
                breached: evaluation.breached,
                value_missing: false,
            },
            created,
        ))
    }
}

fn resolve_value(covenant: &Covenant, facility: &Facility) -> Option<Decimal> {
    match covenant.source {
        CovenantSource::LtvFromFacility => Some(facility.ltv_ratio),
        CovenantSource::NavFromFundAdmin => facility.latest_nav,
        CovenantSource::Manual => covenant.current_value,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
