use std::fmt;

use thiserror::Error;

use super::runner::RunnerError;
use super::templating::TemplateError;
use super::transformers::TransformError;
use crate::models::{QueryName, TimeRange};

/// Step of a job in which it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    QueryReplacer,
    Executor,
    AssignTransformer,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::QueryReplacer => "QueryReplacer",
            Self::Executor => "executor",
            Self::AssignTransformer => "assignTransformer",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum JobFailure {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("job panicked: {0}")]
    Panicked(String),
}

/// Non-fatal error of a run. The run still returns whatever the other jobs
/// produced.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("unexpected query name '{0}'")]
    UnknownQuery(String),

    #[error("{stage} failed for ({time_range}, {query}): {source}")]
    Job {
        stage: Stage,
        time_range: TimeRange,
        query: QueryName,
        #[source]
        source: JobFailure,
    },
}

impl ExecutorError {
    pub(crate) fn job(
        stage: Stage,
        query: QueryName,
        time_range: TimeRange,
        source: impl Into<JobFailure>,
    ) -> Self {
        Self::Job {
            stage,
            time_range,
            query,
            source: source.into(),
        }
    }

    /// Failing stage, for job errors.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::UnknownQuery(_) => None,
            Self::Job { stage, .. } => Some(*stage),
        }
    }

    /// The `(query, time range)` a job error belongs to.
    pub fn job_key(&self) -> Option<(QueryName, TimeRange)> {
        match self {
            Self::UnknownQuery(_) => None,
            Self::Job {
                query, time_range, ..
            } => Some((*query, *time_range)),
        }
    }
}
