//! Fan-out of the query catalogue over every time range.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::task::{Id, JoinSet};
use tracing::{Instrument, instrument};
use uuid::Uuid;

use super::aggregator::aggregate;
use super::clock::Clock;
use super::error::{ExecutorError, JobFailure, Stage};
use super::runner::{RunContext, Runner, Warehouse};
use super::skip_policy::should_skip;
use super::templating::Templater;
use super::transformers::transform;
use crate::models::{
    QueryCatalogue, QueryName, RecommendationSummary, Replacements, TimeRange, TransformerContext,
};

/// Result of one run: the merged summary, if any job produced a document,
/// and every error collected along the way.
#[derive(Debug, Default)]
pub struct ExecutionOutcome {
    pub summary: Option<RecommendationSummary>,
    pub errors: Vec<ExecutorError>,
    pub scheduled: usize,
    pub skipped: usize,
}

/// Read-only inputs shared by every job of a run.
struct RunInputs {
    replacements: Replacements,
    ctx: TransformerContext,
    catalogue: QueryCatalogue,
    now: DateTime<Utc>,
}

/// A runnable catalogue entry.
#[derive(Debug, Clone)]
struct Planned {
    query: QueryName,
    runner: Runner,
    template: String,
}

pub struct Executor {
    warehouse: Arc<dyn Warehouse>,
    clock: Arc<dyn Clock>,
}

impl Executor {
    pub fn new(warehouse: Arc<dyn Warehouse>, clock: Arc<dyn Clock>) -> Self {
        Self { warehouse, clock }
    }

    /// Runs every catalogue query for every time range and merges the
    /// resulting documents. Job failures are returned next to the partial
    /// summary; they never abort the run.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4()))]
    pub async fn execute(
        &self,
        replacements: &Replacements,
        ctx: &TransformerContext,
        catalogue: &QueryCatalogue,
        has_discovery_data: bool,
    ) -> ExecutionOutcome {
        let started = Instant::now();
        let mut outcome = ExecutionOutcome::default();

        let planned = plan(catalogue, &mut outcome.errors);
        let inputs = Arc::new(RunInputs {
            replacements: replacements.clone(),
            ctx: ctx.clone(),
            catalogue: catalogue.clone(),
            now: self.clock.now(),
        });

        let mut tasks = JoinSet::new();
        let mut jobs: HashMap<Id, (QueryName, TimeRange)> = HashMap::new();

        for time_range in TimeRange::ALL {
            for job in &planned {
                if should_skip(job.query, time_range, replacements, has_discovery_data) {
                    tracing::debug!(query = %job.query, time_range = %time_range, "Skipping job");
                    outcome.skipped += 1;
                    continue;
                }

                let span = tracing::info_span!("job", query = %job.query, time_range = %time_range);
                let fut = run_job(
                    Arc::clone(&inputs),
                    Arc::clone(&self.warehouse),
                    job.clone(),
                    time_range,
                );
                let handle = tasks.spawn(fut.instrument(span));
                jobs.insert(handle.id(), (job.query, time_range));
                outcome.scheduled += 1;
            }
        }

        let mut parts = Vec::with_capacity(outcome.scheduled);
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Ok(part))) => parts.push(part),
                Ok((_, Err(e))) => outcome.errors.push(e),
                Err(join_err) => {
                    let Some((query, time_range)) = jobs.get(&join_err.id()).copied() else {
                        tracing::error!(error = %join_err, "Unknown job failed to join");
                        continue;
                    };
                    tracing::error!(
                        query = %query,
                        time_range = %time_range,
                        error = %join_err,
                        "Job did not complete"
                    );
                    outcome.errors.push(ExecutorError::job(
                        Stage::Executor,
                        query,
                        time_range,
                        JobFailure::Panicked(join_err.to_string()),
                    ));
                }
            }
        }

        let summary = aggregate(parts);
        tracing::info!(
            scheduled = outcome.scheduled,
            skipped = outcome.skipped,
            failed = outcome.errors.len(),
            documents = summary.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Optimizer run complete"
        );
        outcome.summary = (!summary.is_empty()).then_some(summary);
        outcome
    }
}

/// Parses catalogue names into runnable entries, once per query name.
/// Names that are unknown or have no runner are reported as errors.
fn plan(catalogue: &QueryCatalogue, errors: &mut Vec<ExecutorError>) -> Vec<Planned> {
    let mut planned: BTreeMap<QueryName, Planned> = BTreeMap::new();

    for (mode, queries) in &catalogue.queries_per_mode {
        for (name, template) in queries {
            let Ok(query) = QueryName::from_str(name) else {
                tracing::error!(mode = %mode, query = %name, "Unknown query name in catalogue");
                errors.push(ExecutorError::UnknownQuery(name.clone()));
                continue;
            };
            let Some(runner) = Runner::for_query(query) else {
                tracing::error!(mode = %mode, query = %name, "No runner for query");
                errors.push(ExecutorError::UnknownQuery(name.clone()));
                continue;
            };
            if planned.contains_key(&query) {
                tracing::debug!(mode = %mode, query = %name, "Query listed under several modes");
                continue;
            }
            planned.insert(
                query,
                Planned {
                    query,
                    runner,
                    template: template.clone(),
                },
            );
        }
    }

    planned.into_values().collect()
}

async fn run_job(
    inputs: Arc<RunInputs>,
    warehouse: Arc<dyn Warehouse>,
    job: Planned,
    time_range: TimeRange,
) -> Result<RecommendationSummary, ExecutorError> {
    let Planned {
        query,
        runner,
        template,
    } = job;
    let fail = |stage: Stage, source: JobFailure| {
        tracing::error!(stage = %stage, error = %source, "Job failed");
        ExecutorError::job(stage, query, time_range, source)
    };

    let templater = Templater::new(
        &inputs.replacements,
        &inputs.catalogue.fragments,
        inputs.ctx.price_per_tb_scan,
        inputs.now,
    );

    let sql = if query.skips_substitution() {
        template
    } else {
        templater
            .substitute(query, &template, time_range)
            .map_err(|e| fail(Stage::QueryReplacer, e.into()))?
    };

    let run_ctx = RunContext {
        warehouse: warehouse.as_ref(),
        templater: &templater,
        catalogue: &inputs.catalogue,
        query,
        time_range,
    };
    let raw = runner
        .run(&run_ctx, &sql)
        .await
        .map_err(|e| fail(Stage::Executor, e.into()))?;

    transform(raw, time_range, &inputs.ctx, inputs.now)
        .map_err(|e| fail(Stage::AssignTransformer, e.into()))
}
