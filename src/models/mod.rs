mod documents;
mod query;
mod raw_result;
mod replacements;
mod rows;
mod summary;

pub use documents::*;
pub use query::*;
pub use raw_result::*;
pub use replacements::*;
pub use rows::*;
pub use summary::*;
