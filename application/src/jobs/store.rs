//! In-memory job registry.
//!
//! The store owns every job; other components mutate jobs only through its
//! operations, which lock, validate, and re-store. Snapshots are returned by
//! value so no reference outlives an operation.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use council_domain::{
    round_progress, Job, JobError, JobId, JobStatus, ResearchOptions, ResearchReport,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Thread-safe in-memory registry of research jobs.
#[derive(Clone, Default)]
pub struct JobStore {
    inner: Arc<Mutex<HashMap<JobId, Job>>>,
}

/// `updated_at` must never decrease, even if the wall clock does.
fn monotonic_now(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous)
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, Job>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new queued job and return its snapshot.
    pub fn create(
        &self,
        query: impl Into<String>,
        options: ResearchOptions,
        user_id: Option<String>,
    ) -> Job {
        let job = Job::new(query, options, user_id);
        self.lock().insert(job.id.clone(), job.clone());
        debug!(job_id = %job.id, "job created");
        job
    }

    /// Fetch a snapshot. When both the caller and the job carry a non-empty
    /// `user_id` and they differ, the job is invisible to the caller.
    pub fn get(&self, id: &JobId, user_id: Option<&str>) -> Option<Job> {
        let guard = self.lock();
        let job = guard.get(id)?;
        if let (Some(caller), Some(owner)) = (user_id, job.user_id.as_deref()) {
            if !caller.is_empty() && !owner.is_empty() && caller != owner {
                return None;
            }
        }
        Some(job.clone())
    }

    /// Transition a job's status. Returns `None` when the job is unknown or
    /// the transition is not permitted (`queued → running → terminal`).
    pub fn update_status(&self, id: &JobId, status: JobStatus) -> Option<Job> {
        let mut guard = self.lock();
        let job = guard.get_mut(id)?;
        if !job.status.can_transition_to(status) {
            return None;
        }
        let now = monotonic_now(job.updated_at);
        job.status = status;
        job.updated_at = now;
        if status == JobStatus::Running && job.started_at.is_none() {
            job.started_at = Some(now);
        }
        if status.is_terminal() {
            job.completed_at = Some(now);
        }
        Some(job.clone())
    }

    /// Update progress, rounding to the nearest multiple of 5 and clamping
    /// to `[0, 100]`.
    pub fn update_progress(
        &self,
        id: &JobId,
        progress: i64,
        remaining_seconds: Option<u64>,
        current_iteration: Option<u32>,
        total_iterations: Option<u32>,
    ) -> Option<Job> {
        let mut guard = self.lock();
        let job = guard.get_mut(id)?;
        job.progress = round_progress(progress);
        job.updated_at = monotonic_now(job.updated_at);
        job.estimated_remaining_seconds = remaining_seconds;
        if current_iteration.is_some() {
            job.current_iteration = current_iteration;
        }
        if total_iterations.is_some() {
            job.total_iterations = total_iterations;
        }
        Some(job.clone())
    }

    /// Complete a job with its report: status `completed`, progress 100.
    pub fn set_result(&self, id: &JobId, result: ResearchReport) -> Option<Job> {
        let mut guard = self.lock();
        let job = guard.get_mut(id)?;
        if !job.status.can_transition_to(JobStatus::Completed) {
            return None;
        }
        let now = monotonic_now(job.updated_at);
        job.status = JobStatus::Completed;
        job.progress = 100;
        job.result = Some(result);
        job.updated_at = now;
        job.completed_at = Some(now);
        job.estimated_remaining_seconds = None;
        Some(job.clone())
    }

    /// Fail a job: status `failed`, progress reset to 0.
    pub fn set_error(&self, id: &JobId, error: JobError) -> Option<Job> {
        let mut guard = self.lock();
        let job = guard.get_mut(id)?;
        if !job.status.can_transition_to(JobStatus::Failed) {
            return None;
        }
        let now = monotonic_now(job.updated_at);
        job.status = JobStatus::Failed;
        job.progress = 0;
        job.error = Some(error);
        job.updated_at = now;
        job.completed_at = Some(now);
        job.estimated_remaining_seconds = None;
        Some(job.clone())
    }

    /// Queued jobs, oldest first.
    pub fn list_queued(&self) -> Vec<Job> {
        let guard = self.lock();
        let mut queued: Vec<Job> = guard
            .values()
            .filter(|j| j.status == JobStatus::Queued)
            .cloned()
            .collect();
        queued.sort_by_key(|j| j.created_at);
        queued
    }

    /// Remove terminal jobs older than `max_age_hours`. Returns the number
    /// removed.
    pub fn cleanup(&self, max_age_hours: i64) -> usize {
        let cutoff = Utc::now() - ChronoDuration::hours(max_age_hours);
        let mut guard = self.lock();
        let before = guard.len();
        guard.retain(|_, job| {
            !(job.status.is_terminal()
                && job.completed_at.map_or(false, |done| done < cutoff))
        });
        before - guard.len()
    }
}
