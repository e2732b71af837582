//! Level loop, batch rounds and checkpointing.
use crate::batch::fan_out;
use crate::client::{InferenceClient, InvokeRequest};
use crate::error::SoakError;
use crate::health::{HealthGate, ResourceProbe};
use crate::log::BatchLog;
use crate::payload::PromptPayload;
use crate::store::StateStore;
use crate::telemetry;
use soak_core::{BatchResult, RequestOutcome, RunState, ServiceTier, SoakConfig};
use std::path::PathBuf;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

/// What a call to [`SoakDriver::run`] got through.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Every level finished and the resume state was removed.
    pub completed: bool,
    /// Batch rounds completed by this process.
    pub batches: u64,
    /// Rows appended to the log by this process.
    pub rows: u64,
    pub log_path: PathBuf,
    pub state_path: PathBuf,
}

enum LevelOutcome {
    Completed,
    Stopped,
}

#[derive(Default)]
struct Progress {
    batches: u64,
    rows: u64,
}

/// Soak-test driver.
///
/// Walks the configured concurrency levels in order. Every batch round fires one batch per
/// service tier, appends one row per batch to the log and then checkpoints the [`RunState`]. The
/// cancellation token is honoured between rounds; a round that has started always finishes.
pub struct SoakDriver<C> {
    config: SoakConfig,
    client: Arc<C>,
    payload: PromptPayload,
    store: StateStore,
    health: HealthGate,
}

impl<C> SoakDriver<C>
where
    C: InferenceClient + Send + Sync + 'static,
{
    pub fn new(config: SoakConfig, client: Arc<C>, payload: PromptPayload) -> Self {
        let store = StateStore::new(config.state_path());
        let health = HealthGate::system(config.health.clone(), &config.data_dir);
        Self {
            config,
            client,
            payload,
            store,
            health,
        }
    }

    /// Replace the host resource probe used by the health gate.
    pub fn with_probe(mut self, probe: Box<dyn ResourceProbe>) -> Self {
        self.health = HealthGate::new(self.config.health.clone(), probe);
        self
    }

    pub fn config(&self) -> &SoakConfig {
        &self.config
    }

    #[instrument(name = "soak", skip_all, fields(region = %self.config.region, model = %self.config.model_id))]
    pub async fn run(mut self, token: CancellationToken) -> Result<RunSummary, SoakError> {
        self.config.validate()?;
        telemetry::describe();

        let now = OffsetDateTime::now_utc();
        let mut state = self.resume_or_fresh(now)?;
        let log = BatchLog::new(self.config.log_path(now));

        info!("Run {} started at {}", state.run_id, state.run_start);
        info!("Concurrency levels: {:?}", self.config.levels);
        info!("Log: {}", log.path().display());
        info!("State: {}", self.store.path().display());

        let mut progress = Progress::default();
        while state.current_concurrency_index < self.config.levels.len() {
            if token.is_cancelled() {
                break;
            }

            match self
                .run_level(&mut state, &log, &token, &mut progress)
                .await?
            {
                LevelOutcome::Completed => {
                    state.complete_level();
                    self.store.save(&state)?;
                }
                LevelOutcome::Stopped => break,
            }
        }

        let completed = state.current_concurrency_index >= self.config.levels.len();
        if completed {
            self.store.clear()?;
            let total = OffsetDateTime::now_utc() - state.run_start;
            info!(
                "Soak test complete after {:.1}h",
                total.as_seconds_f64() / 3600.
            );
        } else {
            self.store.save(&state)?;
            info!(
                "Stopped; rerun to resume from {}",
                self.store.path().display()
            );
        }

        Ok(RunSummary {
            run_id: state.run_id,
            completed,
            batches: progress.batches,
            rows: progress.rows,
            log_path: log.path().to_path_buf(),
            state_path: self.store.path().to_path_buf(),
        })
    }

    fn resume_or_fresh(&self, now: OffsetDateTime) -> Result<RunState, SoakError> {
        let levels = &self.config.levels;
        let state = match self.store.load()? {
            Some(state) if state.current_concurrency_index < levels.len() => {
                let idx = state.current_concurrency_index;
                if state.level_in_progress() {
                    info!(
                        "Resuming concurrency level {} after batch #{}",
                        levels[idx], state.batch_count
                    );
                } else {
                    info!("Resuming at concurrency level {}", levels[idx]);
                }
                state
            }
            Some(state) if state.current_concurrency_index == levels.len() => {
                info!("Previous run already finished every level");
                state
            }
            Some(state) => {
                warn!(
                    "Stored state points at level {} but only {} are configured; starting fresh",
                    state.current_concurrency_index,
                    levels.len()
                );
                RunState::fresh(now)
            }
            None => {
                info!("Starting a new run");
                RunState::fresh(now)
            }
        };
        Ok(state)
    }

    #[instrument(name = "level", skip_all, fields(concurrency = self.config.levels[state.current_concurrency_index]))]
    async fn run_level(
        &mut self,
        state: &mut RunState,
        log: &BatchLog,
        token: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<LevelOutcome, SoakError> {
        let concurrency = self.config.levels[state.current_concurrency_index];
        let level_start = state.begin_level(OffsetDateTime::now_utc());
        let level_end = level_start + self.config.level_duration;
        let level_hours = self.config.level_duration.as_secs_f64() / 3600.;
        info!("Concurrency level {concurrency}: started {level_start}, ends {level_end}");

        loop {
            if token.is_cancelled() {
                return Ok(LevelOutcome::Stopped);
            }

            let round_start = OffsetDateTime::now_utc();
            let timer = Instant::now();
            if round_start >= level_end {
                info!("Concurrency level {concurrency} complete");
                return Ok(LevelOutcome::Completed);
            }

            if self.health.due(state.batch_count + 1) {
                self.health.wait_if_unhealthy(token).await;
                if token.is_cancelled() {
                    return Ok(LevelOutcome::Stopped);
                }
            }

            let batch = state.next_batch();
            let elapsed_hours = (round_start - level_start).as_seconds_f64() / 3600.;
            let pct = if level_hours > 0. {
                elapsed_hours / level_hours * 100.
            } else {
                100.
            };
            info!(
                "Concurrency {concurrency} | batch #{batch} | {elapsed_hours:.1}h/{level_hours:.1}h ({pct:.1}%)"
            );

            for &tier in &self.config.tiers {
                let res = self.run_batch(tier, concurrency, batch).await;
                log.append(round_start, &res)?;
                progress.rows += 1;

                if res.failed == 0 {
                    info!(
                        "  {tier:8} ok {:>6.0}ms took {:.1}s",
                        res.avg_server_latency,
                        res.batch_time.as_secs_f64()
                    );
                } else {
                    warn!(
                        "  {tier:8} {} failed {:>6.0}ms took {:.1}s",
                        res.failed,
                        res.avg_server_latency,
                        res.batch_time.as_secs_f64()
                    );
                }
            }

            self.store.save(state)?;
            progress.batches += 1;

            if let Some(wait) = self.config.interval.checked_sub(timer.elapsed()) {
                if !wait.is_zero() {
                    trace!("Next round in {}", humantime::format_duration(wait));
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = token.cancelled() => {}
                    }
                }
            }
        }
    }

    /// Fires `concurrency` requests at `tier` in parallel and aggregates them.
    pub async fn run_batch(&self, tier: ServiceTier, concurrency: usize, batch: u64) -> BatchResult {
        let requests = (0..concurrency)
            .map(|worker| {
                let test_id = format!("{tier}_{concurrency}_{batch}_{worker}");
                InvokeRequest {
                    model_id: self.config.model_id.clone(),
                    tier,
                    body: self.payload.body(&test_id),
                    test_id,
                }
            })
            .collect();

        let start = Instant::now();
        let outcomes = fan_out(&self.client, &self.config.retry, requests).await;
        let res = BatchResult::from_outcomes(tier, concurrency, &outcomes, start.elapsed());

        let downgraded = outcomes
            .iter()
            .filter(|outcome| match outcome {
                RequestOutcome::Success(m) => m
                    .confirmed_tier
                    .as_deref()
                    .is_some_and(|t| t.parse::<ServiceTier>().ok() != Some(tier)),
                RequestOutcome::Failure { .. } => false,
            })
            .count();
        if downgraded > 0 {
            warn!("{downgraded} of {concurrency} {tier} requests were served at another tier");
        }

        res
    }
}
