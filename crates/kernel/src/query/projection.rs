//! Field projection.

use super::config::QueryConfig;

/// Intersect requested fields with the projection allow-list, keeping request
/// order. `None` means unrestricted: nothing was requested or nothing
/// requested is allowed.
pub fn project_fields(requested: &[String], config: &QueryConfig) -> Option<Vec<String>> {
    if requested.is_empty() {
        return None;
    }

    let allowed = config.projection_allow_list();
    let (kept, dropped): (Vec<&String>, Vec<&String>) = requested
        .iter()
        .partition(|field| allowed.contains(&field.as_str()));

    if !dropped.is_empty() {
        tracing::debug!(fields = ?dropped, "dropping unselectable fields");
    }
    if kept.is_empty() {
        return None;
    }
    Some(kept.into_iter().cloned().collect())
}
