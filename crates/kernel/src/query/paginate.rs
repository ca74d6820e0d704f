//! Page window computation.

use super::config::QueryConfig;
use super::types::{PageMeta, ParsedNumber};

/// Normalized paging for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Current page number (1-indexed).
    pub page: u64,
    /// Items per page, within `[1, max_limit]`.
    pub limit: u64,
    /// Rows skipped before the page starts.
    pub skip: u64,
}

impl PageWindow {
    /// Build result metadata once the total row count is known.
    pub fn meta(&self, total: u64) -> PageMeta {
        PageMeta::new(self.page, self.limit, total)
    }
}

/// Normalize requested page/limit against the configured bounds.
///
/// Non-positive, malformed or missing values fall back to page 1 and the
/// default limit; a limit above the maximum is capped.
pub fn paginate(page: ParsedNumber, limit: ParsedNumber, config: &QueryConfig) -> PageWindow {
    let max_limit = config.effective_max_limit();
    let page = page.positive().unwrap_or(1);
    let requested = limit
        .positive()
        .unwrap_or_else(|| config.effective_default_limit());

    if requested > max_limit {
        tracing::warn!(
            requested = requested,
            capped = max_limit,
            "limit exceeds maximum, capping"
        );
    }
    let limit = requested.clamp(1, max_limit);

    PageWindow {
        page,
        limit,
        skip: (page - 1).saturating_mul(limit),
    }
}
