//! # Expired One-Shot Task Reaper
//!
//! Finds run-once tasks flagged for self-removal that have already fired, and
//! submits a removal job for each whose wall-clock fire time, interpreted in the
//! owning agent's time zone, is strictly before `now`.
//!
//! The reaper writes nothing itself; the removal job owns deletion.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::{ReconcileError, ReconcileResult};
use crate::jobs::{JobDispatcher, JobRequest};
use crate::metrics;
use crate::models::CoreSettings;
use crate::store::{ExpiryCandidate, FleetStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReapOutcome {
    RemovalSubmitted,
    NotYetDue,
    /// The agent's zone (or the fleet default) is not a known IANA name
    InvalidTimeZone(String),
    /// The wall-clock time falls inside a DST gap in the agent's zone
    NonexistentLocalTime,
    MissingRunTime,
    SubmitFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReapCandidateOutcome {
    pub task_id: i64,
    pub agent_id: i64,
    pub time_zone: String,
    pub fire_at: Option<DateTime<Utc>>,
    pub outcome: ReapOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReaperReport {
    pub candidates: Vec<ReapCandidateOutcome>,
}

impl ReaperReport {
    pub fn submitted_task_ids(&self) -> Vec<i64> {
        self.candidates
            .iter()
            .filter(|c| c.outcome == ReapOutcome::RemovalSubmitted)
            .map(|c| c.task_id)
            .collect()
    }

    pub fn outcome_for(&self, task_id: i64) -> Option<&ReapOutcome> {
        self.candidates
            .iter()
            .find(|c| c.task_id == task_id)
            .map(|c| &c.outcome)
    }
}

/// Interpret a wall-clock time in the named zone as an absolute instant
///
/// Ambiguous local times (DST fall-back) resolve to the earliest instant.
///
/// # Errors
///
/// [`ReconcileError::InvalidTimeZone`] for an unknown zone name and
/// [`ReconcileError::InvalidTimestamp`] for a local time that does not exist.
pub fn resolve_fire_instant(
    run_time_date: NaiveDateTime,
    time_zone: &str,
) -> ReconcileResult<DateTime<Utc>> {
    let tz: Tz = time_zone
        .parse()
        .map_err(|_| ReconcileError::InvalidTimeZone(time_zone.to_string()))?;

    tz.from_local_datetime(&run_time_date)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            ReconcileError::InvalidTimestamp(format!(
                "{run_time_date} does not exist in {time_zone}"
            ))
        })
}

/// Decide what to do with one candidate at `now`
pub fn evaluate_candidate(
    candidate: &ExpiryCandidate,
    default_time_zone: &str,
    now: DateTime<Utc>,
) -> (String, Option<DateTime<Utc>>, ReapOutcome) {
    let time_zone = match candidate.agent_time_zone.as_deref() {
        Some(tz) if !tz.trim().is_empty() => tz.trim().to_string(),
        _ => default_time_zone.to_string(),
    };

    let Some(run_time_date) = candidate.run_time_date else {
        return (time_zone, None, ReapOutcome::MissingRunTime);
    };

    match resolve_fire_instant(run_time_date, &time_zone) {
        Ok(fire_at) if fire_at < now => (time_zone, Some(fire_at), ReapOutcome::RemovalSubmitted),
        Ok(fire_at) => (time_zone, Some(fire_at), ReapOutcome::NotYetDue),
        Err(ReconcileError::InvalidTimeZone(tz)) => {
            (time_zone, None, ReapOutcome::InvalidTimeZone(tz))
        }
        Err(_) => (time_zone, None, ReapOutcome::NonexistentLocalTime),
    }
}

#[derive(Clone)]
pub struct ExpiredTaskReaper {
    store: Arc<dyn FleetStore>,
    jobs: Arc<dyn JobDispatcher>,
}

impl std::fmt::Debug for ExpiredTaskReaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiredTaskReaper").finish_non_exhaustive()
    }
}

impl ExpiredTaskReaper {
    pub fn new(store: Arc<dyn FleetStore>, jobs: Arc<dyn JobDispatcher>) -> Self {
        Self { store, jobs }
    }

    /// Submit removal jobs for every candidate whose fire time is before `now`
    ///
    /// # Errors
    ///
    /// [`ReconcileError::MissingCoreSettings`] when the settings record holding
    /// the fleet default zone is absent. Per-candidate problems never fail the run.
    pub async fn reap(&self, now: DateTime<Utc>) -> ReconcileResult<ReaperReport> {
        let settings: CoreSettings = self
            .store
            .core_settings()
            .await?
            .ok_or(ReconcileError::MissingCoreSettings)?;

        let candidates = self.store.expiry_candidates().await?;
        let mut report = ReaperReport::default();

        for candidate in &candidates {
            let (time_zone, fire_at, mut outcome) =
                evaluate_candidate(candidate, &settings.default_time_zone, now);

            match &outcome {
                ReapOutcome::RemovalSubmitted => {
                    if let Err(e) = self
                        .jobs
                        .submit(JobRequest::delete_task_schedule(candidate.task_id))
                    {
                        warn!(
                            task_id = candidate.task_id,
                            agent_id = candidate.agent_id,
                            error = %e,
                            "Failed to submit expired task removal"
                        );
                        outcome = ReapOutcome::SubmitFailed(e.to_string());
                    } else {
                        metrics::expired_task_removals_total().add(1, &[]);
                        debug!(
                            task_id = candidate.task_id,
                            agent_id = candidate.agent_id,
                            fire_at = ?fire_at,
                            "Expired run-once task scheduled for removal"
                        );
                    }
                }
                ReapOutcome::InvalidTimeZone(tz) => {
                    warn!(
                        task_id = candidate.task_id,
                        agent_id = candidate.agent_id,
                        time_zone = %tz,
                        "Skipping run-once task with unknown time zone"
                    );
                }
                ReapOutcome::NonexistentLocalTime => {
                    warn!(
                        task_id = candidate.task_id,
                        agent_id = candidate.agent_id,
                        time_zone = %time_zone,
                        run_time_date = ?candidate.run_time_date,
                        "Skipping run-once task whose fire time falls in a DST gap"
                    );
                }
                ReapOutcome::MissingRunTime => {
                    debug!(task_id = candidate.task_id, "Run-once task has no run time");
                }
                ReapOutcome::NotYetDue | ReapOutcome::SubmitFailed(_) => {}
            }

            report.candidates.push(ReapCandidateOutcome {
                task_id: candidate.task_id,
                agent_id: candidate.agent_id,
                time_zone,
                fire_at,
                outcome,
            });
        }

        let submitted = report.submitted_task_ids().len();
        if submitted > 0 {
            info!(
                candidates = candidates.len(),
                submitted = submitted,
                "Expired run-once tasks submitted for removal"
            );
        } else {
            debug!(candidates = candidates.len(), "No expired run-once tasks");
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn candidate(run_time_date: Option<NaiveDateTime>, tz: Option<&str>) -> ExpiryCandidate {
        ExpiryCandidate {
            task_id: 1,
            agent_id: 1,
            run_time_date,
            agent_time_zone: tz.map(str::to_string),
        }
    }

    #[test]
    fn test_resolve_fire_instant_applies_offset() {
        // New York is UTC-5 in January
        let fire = resolve_fire_instant(naive(2024, 1, 15, 9, 0), "America/New_York").unwrap();
        assert_eq!(fire, Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_resolve_fire_instant_rejects_unknown_zone() {
        let err = resolve_fire_instant(naive(2024, 1, 15, 9, 0), "Mars/Olympus").unwrap_err();
        assert_eq!(err, ReconcileError::InvalidTimeZone("Mars/Olympus".to_string()));
    }

    #[test]
    fn test_resolve_fire_instant_dst_gap_and_overlap() {
        // 02:30 does not exist on 2024-03-10 in New York
        assert!(matches!(
            resolve_fire_instant(naive(2024, 3, 10, 2, 30), "America/New_York"),
            Err(ReconcileError::InvalidTimestamp(_))
        ));

        // 01:30 occurs twice on 2024-11-03; earliest is the EDT reading
        let fire = resolve_fire_instant(naive(2024, 11, 3, 1, 30), "America/New_York").unwrap();
        assert_eq!(fire, Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap());
    }

    #[test]
    fn test_evaluate_is_strictly_before_now() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
        let exact = candidate(Some(naive(2024, 1, 15, 9, 0)), Some("America/New_York"));
        assert_eq!(evaluate_candidate(&exact, "UTC", now).2, ReapOutcome::NotYetDue);

        let earlier = candidate(Some(naive(2024, 1, 15, 8, 59)), Some("America/New_York"));
        assert_eq!(
            evaluate_candidate(&earlier, "UTC", now).2,
            ReapOutcome::RemovalSubmitted
        );
    }

    #[test]
    fn test_evaluate_falls_back_to_default_zone() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        // 13:00 in Berlin (UTC+2 in summer) is 11:00 UTC
        let c = candidate(Some(naive(2024, 6, 1, 13, 0)), None);
        let (tz, fire_at, outcome) = evaluate_candidate(&c, "Europe/Berlin", now);
        assert_eq!(tz, "Europe/Berlin");
        assert_eq!(fire_at, Some(Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap()));
        assert_eq!(outcome, ReapOutcome::RemovalSubmitted);

        // Same wall clock read as UTC has not fired yet
        assert_eq!(evaluate_candidate(&c, "UTC", now).2, ReapOutcome::NotYetDue);
    }

    #[test]
    fn test_evaluate_missing_run_time() {
        let c = candidate(None, Some("UTC"));
        assert_eq!(
            evaluate_candidate(&c, "UTC", Utc::now()).2,
            ReapOutcome::MissingRunTime
        );
    }
}
