//! Cost-optimization recommendations for a data warehouse.
//!
//! A run executes the recommendation query catalogue for every usage mode
//! and time range ([`optimizer::Executor`]), reshapes the rows into
//! documents and merges them into one summary, which
//! [`db::RecommendationsRepo::commit`] writes in a single transaction.

pub mod config;
pub mod db;
pub mod models;
pub mod observability;
pub mod optimizer;
