//! Store delegate trait.
//!
//! The query engine never touches storage directly; it hands a compiled spec
//! to a `QueryStore` and awaits two reads.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::types::{CompiledQuerySpec, CountSpec};

/// Read-only storage backend for list queries.
#[async_trait]
pub trait QueryStore: Send + Sync {
    /// Record type returned by `find_many`.
    type Record: Send;

    /// Fetch one page of records matching the spec.
    async fn find_many(&self, spec: &CompiledQuerySpec) -> Result<Vec<Self::Record>>;

    /// Count every record matching the filter.
    async fn count(&self, spec: &CountSpec) -> Result<u64>;
}

#[async_trait]
impl<S: QueryStore + ?Sized> QueryStore for Arc<S> {
    type Record = S::Record;

    async fn find_many(&self, spec: &CompiledQuerySpec) -> Result<Vec<Self::Record>> {
        (**self).find_many(spec).await
    }

    async fn count(&self, spec: &CountSpec) -> Result<u64> {
        (**self).count(spec).await
    }
}
