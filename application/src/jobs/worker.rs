//! Research worker
//!
//! A single background task that drains queued research jobs one at a time.
//! It wakes on an enqueue signal or on the polling interval, whichever comes
//! first, and drains the current job before honoring shutdown.

use crate::jobs::store::JobStore;
use crate::ports::progress::{ResearchProgress, ResearchStage};
use crate::use_cases::deep_research::{ResearchOutcome, ResearchPipeline};
use council_domain::{
    FallbackReason, Job, JobError, JobId, JobStatus, ReportMetadata, ReportSection,
    ResearchReport, SectionKind,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Milestones exposed per stage plus completion.
pub const TOTAL_ITERATIONS: u32 = 5;
/// Queue poll interval when no enqueue signal arrives.
const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Remaining-time heuristic per outstanding iteration.
const SECONDS_PER_ITERATION: u64 = 3;

/// Background worker that processes queued research jobs.
pub struct ResearchWorker {
    store: JobStore,
    pipeline: Arc<ResearchPipeline>,
    trigger: Arc<Notify>,
    shutdown: CancellationToken,
}

impl ResearchWorker {
    pub fn new(
        store: JobStore,
        pipeline: Arc<ResearchPipeline>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            pipeline,
            trigger: Arc::new(Notify::new()),
            shutdown,
        }
    }

    /// Handle used to wake the worker immediately when a job is enqueued.
    pub fn trigger(&self) -> Arc<Notify> {
        Arc::clone(&self.trigger)
    }

    /// Spawn the worker loop.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        info!("research worker started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.trigger.notified() => {}
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
            self.drain_queue().await;
        }
        info!("research worker stopped");
    }

    /// Process queued jobs oldest-first until the queue is empty or shutdown
    /// is requested. The in-flight job always runs to completion.
    async fn drain_queue(&self) {
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            let Some(job) = self.store.list_queued().into_iter().next() else {
                break;
            };
            self.process(job).await;
        }
    }

    async fn process(&self, job: Job) {
        // Idempotent against double-triggering: only a queued job can start.
        let Some(job) = self.store.update_status(&job.id, JobStatus::Running) else {
            debug!(job_id = %job.id, "job no longer queued, skipping");
            return;
        };

        info!(job_id = %job.id, "processing research job");
        let started = Instant::now();
        let progress = StoreProgress {
            store: self.store.clone(),
            job_id: job.id.clone(),
        };

        match self.pipeline.run(&job.query, &job.options, &progress).await {
            Ok(outcome) => {
                let report = build_report(outcome, started.elapsed().as_millis() as u64);
                self.store.set_result(&job.id, report);
                info!(job_id = %job.id, "research job completed");
            }
            Err(e) => {
                warn!(job_id = %job.id, "research job failed: {}", e);
                self.store.set_error(&job.id, JobError::classified(e.to_string()));
            }
        }
    }
}

/// Progress sink that writes stage milestones into the store.
struct StoreProgress {
    store: JobStore,
    job_id: JobId,
}

impl ResearchProgress for StoreProgress {
    fn on_stage(&self, stage: ResearchStage) {
        let iteration = stage.iteration();
        let remaining = u64::from(TOTAL_ITERATIONS - iteration) * SECONDS_PER_ITERATION;
        self.store.update_progress(
            &self.job_id,
            i64::from(stage.milestone()),
            Some(remaining),
            Some(iteration),
            Some(TOTAL_ITERATIONS),
        );
    }
}

/// Wrap a pipeline outcome into the structured job result.
fn build_report(outcome: ResearchOutcome, duration_ms: u64) -> ResearchReport {
    let mut sections = vec![ReportSection {
        title: "Summary".to_string(),
        content: outcome.final_answer.clone(),
        kind: SectionKind::Summary,
    }];
    if !outcome.citations.is_empty() {
        sections.push(ReportSection {
            title: "Citations".to_string(),
            content: outcome
                .citations
                .iter()
                .enumerate()
                .map(|(i, url)| format!("{}. {}", i + 1, url))
                .collect::<Vec<_>>()
                .join("\n"),
            kind: SectionKind::Citations,
        });
    }
    if outcome.context.has_sources() {
        sections.push(ReportSection {
            title: "Sources".to_string(),
            content: outcome
                .context
                .results
                .iter()
                .map(|r| format!("{} ({})", r.title, r.url))
                .collect::<Vec<_>>()
                .join("\n"),
            kind: SectionKind::Sources,
        });
    }

    let fallback_reason =
        FallbackReason::derive(outcome.context.has_sources(), outcome.citations.len());

    ResearchReport {
        summary: outcome.final_answer,
        citations: outcome.citations,
        research_sources: outcome.context.results,
        debate_rounds: outcome.rounds.len(),
        metadata: ReportMetadata {
            fallback_reason,
            model_count: outcome.model_answers.len(),
            duration_ms,
        },
        model_answers: outcome.model_answers,
        sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::ports::search_provider::SearchError;
    use crate::testing::{results_fixture, MockModelClient, MockSearchProvider, Scripted};
    use council_domain::{JobErrorCode, ModelId, ResearchOptions};
    use std::time::Duration;

    const JUDGE: &str = "judge/default";

    fn pipeline(
        client: Arc<MockModelClient>,
        search: Arc<MockSearchProvider>,
        rounds: usize,
    ) -> Arc<ResearchPipeline> {
        let config = EngineConfig::default()
            .with_models(vec![ModelId::new("a/one"), ModelId::new("b/two")])
            .with_judge_model(ModelId::new(JUDGE))
            .with_debate(rounds > 0, rounds);
        Arc::new(ResearchPipeline::new(client, search, Arc::new(config)))
    }

    async fn wait_terminal(store: &JobStore, id: &JobId) -> Job {
        loop {
            let job = store.get(id, None).unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn job_runs_to_completion_with_milestones() {
        let client = Arc::new(MockModelClient::new());
        // Judge call order: round-1 feedback, round-2 feedback, final merge.
        client.script(JUDGE, Scripted::ok("sharpen the claims", Duration::ZERO));
        client.script(JUDGE, Scripted::ok("cite your sources", Duration::ZERO));
        client.script(JUDGE, Scripted::ok("Merged [Source 1]", Duration::ZERO));
        let search = Arc::new(MockSearchProvider::with_results(results_fixture(2)));

        let store = JobStore::new();
        let shutdown = CancellationToken::new();
        let worker = ResearchWorker::new(
            store.clone(),
            pipeline(client, search, 2),
            shutdown.clone(),
        );
        let trigger = worker.trigger();
        let handle = worker.spawn();

        let job = store.create("what is rust", ResearchOptions::default(), None);
        trigger.notify_one();

        let done = wait_terminal(&store, &job.id).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress, 100);
        let report = done.result.unwrap();
        assert_eq!(report.debate_rounds, 2);
        assert!(report.metadata.fallback_reason.is_none());
        assert!(report
            .sections
            .iter()
            .any(|s| s.kind == SectionKind::Sources));
        assert_eq!(done.current_iteration, Some(4));
        assert_eq!(done.total_iterations, Some(TOTAL_ITERATIONS));

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn no_search_key_completes_with_no_sources_fallback() {
        let client = Arc::new(MockModelClient::new());
        let search = Arc::new(MockSearchProvider::failing(SearchError::Unconfigured));

        let store = JobStore::new();
        let shutdown = CancellationToken::new();
        let worker = ResearchWorker::new(
            store.clone(),
            pipeline(client, search, 0),
            shutdown.clone(),
        );
        let trigger = worker.trigger();
        let handle = worker.spawn();

        let job = store.create("anything", ResearchOptions::default(), None);
        trigger.notify_one();

        let done = wait_terminal(&store, &job.id).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.progress, 100);
        let report = done.result.unwrap();
        assert_eq!(
            report.metadata.fallback_reason,
            Some(FallbackReason::NoExternalSources)
        );
        assert!(report.research_sources.is_empty());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn pipeline_failure_is_classified() {
        let client = Arc::new(MockModelClient::new());
        for model in ["a/one", "b/two"] {
            client.script(
                model,
                Scripted::err(
                    crate::ports::model_client::ModelCallError::Timeout,
                    Duration::ZERO,
                ),
            );
        }
        let search = Arc::new(MockSearchProvider::with_results(results_fixture(1)));

        let store = JobStore::new();
        let shutdown = CancellationToken::new();
        let worker = ResearchWorker::new(
            store.clone(),
            pipeline(client, search, 0),
            shutdown.clone(),
        );
        let trigger = worker.trigger();
        let handle = worker.spawn();

        let job = store.create("q", ResearchOptions::default(), None);
        trigger.notify_one();

        let done = wait_terminal(&store, &job.id).await;
        assert_eq!(done.status, JobStatus::Failed);
        assert_eq!(done.progress, 0);
        // "No model produced a researched answer" has no timeout/rate-limit
        // substring, so it classifies as the generic research failure.
        assert_eq!(
            done.error.unwrap().code,
            JobErrorCode::ResearchFailed
        );

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn polling_picks_up_jobs_without_a_trigger() {
        let client = Arc::new(MockModelClient::new());
        let search = Arc::new(MockSearchProvider::with_results(results_fixture(1)));

        let store = JobStore::new();
        let shutdown = CancellationToken::new();
        let worker = ResearchWorker::new(
            store.clone(),
            pipeline(client, search, 0),
            shutdown.clone(),
        );
        let handle = worker.spawn();

        let job = store.create("q", ResearchOptions::default(), None);
        // No trigger: the 2s poll finds it
        let done = wait_terminal(&store, &job.id).await;
        assert_eq!(done.status, JobStatus::Completed);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn two_jobs_run_in_creation_order() {
        let client = Arc::new(MockModelClient::new());
        let search = Arc::new(MockSearchProvider::with_results(results_fixture(1)));

        let store = JobStore::new();
        let shutdown = CancellationToken::new();
        let worker = ResearchWorker::new(
            store.clone(),
            pipeline(client, search, 0),
            shutdown.clone(),
        );
        let trigger = worker.trigger();
        let handle = worker.spawn();

        let first = store.create("first", ResearchOptions::default(), None);
        let second = store.create("second", ResearchOptions::default(), None);
        trigger.notify_one();

        let first_done = wait_terminal(&store, &first.id).await;
        let second_done = wait_terminal(&store, &second.id).await;
        assert!(first_done.completed_at.unwrap() <= second_done.completed_at.unwrap());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
