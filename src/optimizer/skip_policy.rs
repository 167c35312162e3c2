use crate::models::{QueryName, Replacements, TimeRange};

/// Whether the `(query, time_range)` job has nothing useful to compute.
///
/// Rules are checked in order and the first match wins:
/// 1. without discovery data, queries that depend on it are skipped;
/// 2. storage size queries only run for the month window;
/// 3. reservation queries are skipped when the customer has no project in
///    the matching reservation group.
pub fn should_skip(
    query: QueryName,
    time_range: TimeRange,
    replacements: &Replacements,
    has_discovery_data: bool,
) -> bool {
    if !has_discovery_data && query.requires_discovery() {
        return true;
    }

    if query.is_storage_tb() {
        return time_range != TimeRange::Month;
    }

    match query.reservation_group() {
        Some(group) => replacements.projects_for(group).is_empty(),
        None => false,
    }
}
