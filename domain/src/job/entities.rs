//! Job entity and lifecycle state machine.

use crate::core::model::ModelId;
use crate::job::report::{JobError, ResearchReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job lifecycle state.
///
/// Transitions respect `queued → running → {completed, failed}`; nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Caller-supplied options for a deep-research job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchOptions {
    /// Query models; empty means the configured defaults.
    #[serde(default)]
    pub models: Vec<ModelId>,
    /// Judge model override.
    #[serde(default)]
    pub judge_model: Option<ModelId>,
    /// Cap on web-search results; `None` means the configured default.
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// A deep-research job as held by the store and exposed to pollers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub user_id: Option<String>,
    pub status: JobStatus,
    /// Always a multiple of 5 in `[0, 100]`.
    pub progress: u8,
    pub current_iteration: Option<u32>,
    pub total_iterations: Option<u32>,
    pub query: String,
    pub options: ResearchOptions,
    pub result: Option<ResearchReport>,
    pub error: Option<JobError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub estimated_remaining_seconds: Option<u64>,
}

impl Job {
    pub fn new(query: impl Into<String>, options: ResearchOptions, user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::generate(),
            user_id,
            status: JobStatus::Queued,
            progress: 0,
            current_iteration: None,
            total_iterations: None,
            query: query.into(),
            options,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            estimated_remaining_seconds: None,
        }
    }
}

/// Round a raw progress value to the nearest multiple of 5, clamped to
/// `[0, 100]`.
pub fn round_progress(raw: i64) -> u8 {
    let rounded = ((raw as f64 / 5.0).round() as i64) * 5;
    rounded.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_queued_at_zero() {
        let job = Job::new("q", ResearchOptions::default(), None);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(job.started_at.is_none());
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn only_forward_transitions_are_permitted() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));

        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Running.can_transition_to(JobStatus::Queued));
    }

    #[test]
    fn progress_rounds_to_nearest_multiple_of_five() {
        assert_eq!(round_progress(0), 0);
        assert_eq!(round_progress(2), 0);
        assert_eq!(round_progress(3), 5);
        assert_eq!(round_progress(12), 10);
        assert_eq!(round_progress(13), 15);
        assert_eq!(round_progress(98), 100);
    }

    #[test]
    fn progress_clamps_to_bounds() {
        assert_eq!(round_progress(-20), 0);
        assert_eq!(round_progress(240), 100);
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Queued).unwrap(),
            "\"queued\""
        );
    }
}
