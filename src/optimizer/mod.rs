//! The recommendation engine: decides which catalogue queries to run,
//! runs them concurrently and reshapes their rows into documents.

mod aggregator;
mod clock;
mod error;
mod executor;
mod replay;
pub mod runner;
mod service;
mod skip_policy;
pub mod templating;
pub mod transformers;

pub use aggregator::aggregate;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ExecutorError, JobFailure, Stage};
pub use executor::{ExecutionOutcome, Executor};
pub use replay::{ReplayEntry, ReplayError, ReplayWarehouse};
pub use runner::{Runner, Warehouse, WarehouseError, WarehouseResult};
pub use service::{OptimizeError, PROGRESS_STARTED, RunReport, STATUS_RUNNING, optimize};
pub use skip_policy::should_skip;
pub use templating::{TemplateError, Templater};
pub use transformers::{TransformError, transform};
