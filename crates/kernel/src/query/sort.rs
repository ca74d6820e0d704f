//! Sort compilation.

use super::config::QueryConfig;
use super::types::{OrderBy, SortDirection};

/// Resolve the single ordering for a request. Never fails: an unknown or
/// disallowed field falls back to the configured default sort field.
pub fn compile_sort(
    sort_by: Option<&str>,
    sort_order: Option<SortDirection>,
    config: &QueryConfig,
) -> OrderBy {
    match sort_by {
        Some(field) if config.is_sortable(field) => {
            OrderBy::new(field, sort_order.unwrap_or_default())
        }
        requested => {
            if let Some(field) = requested {
                tracing::debug!(field = %field, "sort field not allowed, using default");
            }
            OrderBy::new(
                config.default_sort.field.as_str(),
                sort_order.unwrap_or(config.default_sort.direction),
            )
        }
    }
}
