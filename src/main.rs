use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use bq_lens::{
    config::{BqLensConfig, ConfigError},
    db::{self, DbError, DocumentPool},
    models::{QueryCatalogue, QueryName, Replacements, TimeRange, UnknownName},
    observability::{self, TracingError},
    optimizer::{self, Executor, OptimizeError, ReplayError, ReplayWarehouse, SystemClock},
};
use clap::Parser;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// CLI arguments for bq-lens
#[derive(Parser, Debug)]
#[command(version, about = "Warehouse cost recommendations", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (defaults to an in-memory store with default prices)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run database migrations and exit
    Migrate,
    /// Run the query catalogue for one customer and commit the results
    Run {
        #[arg(long)]
        customer: String,
        /// JSON file with the customer's replacements
        #[arg(long)]
        replacements: PathBuf,
        /// JSON file with the query catalogue
        #[arg(long)]
        catalogue: PathBuf,
        /// JSON file of recorded warehouse responses
        #[arg(long)]
        warehouse: PathBuf,
    },
    /// Print one stored recommendation document
    Show {
        #[arg(long)]
        customer: String,
        /// Query name, e.g. `costFromTableTypes`
        #[arg(long)]
        query: String,
        /// One of `past-1-day`, `past-7-days`, `past-30-days`
        #[arg(long)]
        time_range: String,
    },
    /// Print a customer's simulation progress record
    Progress {
        #[arg(long)]
        customer: String,
    },
    /// Print where every document of a customer is stored
    Paths {
        #[arg(long)]
        customer: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tracing(#[from] TracingError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    UnknownName(#[from] UnknownName),
    #[error(transparent)]
    Replay(#[from] ReplayError),
    #[error(transparent)]
    Optimize(#[from] OptimizeError),
    #[error("Failed to read {1}: {0}")]
    Input(#[source] InputError, PathBuf),
    #[error("Failed to render output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
enum InputError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match run(args).await {
        Ok(Some(output)) => println!("{output}"),
        Ok(None) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<Option<String>, CliError> {
    let config = match &args.config {
        Some(path) => BqLensConfig::from_file(path)?,
        None => BqLensConfig::default(),
    };
    observability::init_tracing(&config.observability)?;

    let output = match args.command {
        Command::Migrate => {
            DocumentPool::from_config(&config.database)
                .await?
                .run_migrations()
                .await?;
            tracing::info!("Database migrations completed successfully");
            return Ok(None);
        }
        Command::Run {
            customer,
            replacements,
            catalogue,
            warehouse,
        } => {
            let replacements: Replacements = read_json(&replacements)?;
            let catalogue: QueryCatalogue = read_json(&catalogue)?;
            let warehouse = ReplayWarehouse::from_file(&warehouse)?;

            let clock = Arc::new(SystemClock);
            let executor = Executor::new(Arc::new(warehouse), clock.clone());
            let pool = DocumentPool::from_config(&config.database).await?;
            let repo = pool.recommendations(clock);

            let report = optimizer::optimize(
                &executor,
                &repo,
                &customer,
                &replacements,
                &catalogue,
                &config.optimizer,
            )
            .await?;
            Some(serde_json::to_value(report)?)
        }
        Command::Show {
            customer,
            query,
            time_range,
        } => {
            let query: QueryName = query.parse()?;
            let time_range: TimeRange = time_range.parse()?;
            let path = db::resolve_document_path(&customer, time_range, query)?;
            let pool = DocumentPool::from_config(&config.database).await?;
            pool.store().get(&path).await?.map(Value::Object)
        }
        Command::Progress { customer } => {
            let pool = DocumentPool::from_config(&config.database).await?;
            pool.recommendations(Arc::new(SystemClock))
                .get_simulation_details(&customer)
                .await?
                .map(serde_json::to_value)
                .transpose()?
        }
        Command::Paths { customer } => Some(document_paths(&customer)?),
    };

    Ok(Some(serde_json::to_string_pretty(
        &output.unwrap_or(Value::Null),
    )?))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::Input(e.into(), path.to_path_buf()))?;
    serde_json::from_str(&content).map_err(|e| CliError::Input(e.into(), path.to_path_buf()))
}

/// Every document location of `customer`, by query then time range.
/// Names that never produce a document are left out.
fn document_paths(customer: &str) -> Result<Value, DbError> {
    let mut out = Map::new();
    out.insert(
        "simulationDetails".into(),
        Value::String(db::paths::simulation_details_path(customer)?.to_string()),
    );
    out.insert(
        "recommendationDetails".into(),
        Value::String(db::paths::recommendation_details_path(customer)?.to_string()),
    );

    for &query in QueryName::ALL {
        let mut ranges = Map::new();
        for time_range in TimeRange::ALL {
            if let Ok(path) = db::resolve_document_path(customer, time_range, query) {
                ranges.insert(time_range.to_string(), Value::String(path.to_string()));
            }
        }
        if !ranges.is_empty() {
            out.insert(query.to_string(), Value::Object(ranges));
        }
    }
    Ok(Value::Object(out))
}
