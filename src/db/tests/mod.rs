//! Shared document store test infrastructure
//!
//! The same test logic runs against every `DocumentStore` backend:
//!
//! - **Memory**: the process-local store
//! - **SQLite**: in-memory databases with the real migrations
//!
//! Each test module contains shared test functions taking `&dyn DocumentStore`
//! (or the repository built on it) and one macro-generated submodule per
//! backend.

mod commit;
