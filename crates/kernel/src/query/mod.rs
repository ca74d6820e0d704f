//! List-query engine.
//!
//! Turns an untrusted string-keyed query into a bounded read:
//! - params: tokenizes reserved keys and residual filters
//! - search / filter / sort / paginate / projection / include: one compiler
//!   per concern, each constrained by the entity's `QueryConfig`
//! - QueryBuilder: runs the stages and executes against a `QueryStore`
//! - PgStore / MemoryStore: PostgreSQL and in-process store delegates

pub mod builder;
pub mod config;
pub mod filter;
pub mod include;
pub mod memory;
pub mod paginate;
pub mod params;
pub mod pg_store;
pub mod projection;
pub mod search;
pub mod sort;
pub mod sql;
pub mod store;
pub mod types;

pub use builder::QueryBuilder;
pub use config::QueryConfig;
pub use memory::MemoryStore;
pub use paginate::PageWindow;
pub use pg_store::PgStore;
pub use store::QueryStore;
pub use types::{
    CompiledQuerySpec, CountSpec, EntitySchema, FieldType, FilterOperator, FilterValue,
    IncludeTree, OrderBy, PageMeta, PagedResult, Predicate, QueryParams, RelationSpec,
    SortDirection,
};
