//! Per-entity list-query configuration.
//!
//! A `QueryConfig` is built once per entity type and shared by every request
//! listing that entity. It is the allow-list: no client-supplied key reaches a
//! compiled query unless it is named here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::types::{FieldType, IncludeTree, OrderBy, RelationSpec, SortDirection};

/// Default page size when the request does not ask for one.
pub const DEFAULT_LIMIT: u64 = 10;

/// Hard cap on page size.
pub const MAX_LIMIT: u64 = 100;

/// Allow-lists and defaults for one entity type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryConfig {
    /// Fields the search term is matched against, in match order.
    #[serde(default)]
    pub searchable_fields: Vec<String>,

    /// Fields residual query keys may filter on.
    #[serde(default)]
    pub filterable_fields: Vec<String>,

    /// Explicit sort allow-list. When absent, searchable and filterable
    /// fields are sortable.
    #[serde(default)]
    pub sortable_fields: Option<Vec<String>>,

    /// Fields a client may project onto. When empty, every top-level field
    /// named elsewhere in this config is selectable.
    #[serde(default)]
    pub selectable_fields: Vec<String>,

    /// Coercion types for filterable fields. Undeclared fields are text.
    #[serde(default)]
    pub field_types: HashMap<String, FieldType>,

    #[serde(default = "default_limit")]
    pub default_limit: u64,

    #[serde(default = "max_limit")]
    pub max_limit: u64,

    /// Ordering used when the request names no valid sort field.
    #[serde(default = "default_sort")]
    pub default_sort: OrderBy,

    /// Optional relations a client may request by flag name.
    #[serde(default)]
    pub dynamic_include_whitelist: IncludeTree,
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

fn max_limit() -> u64 {
    MAX_LIMIT
}

fn default_sort() -> OrderBy {
    OrderBy::new("id", SortDirection::Asc)
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            searchable_fields: Vec::new(),
            filterable_fields: Vec::new(),
            sortable_fields: None,
            selectable_fields: Vec::new(),
            field_types: HashMap::new(),
            default_limit: default_limit(),
            max_limit: max_limit(),
            default_sort: default_sort(),
            dynamic_include_whitelist: IncludeTree::new(),
        }
    }
}

fn owned(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

impl QueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn searchable(mut self, fields: &[&str]) -> Self {
        self.searchable_fields = owned(fields);
        self
    }

    pub fn filterable(mut self, fields: &[&str]) -> Self {
        self.filterable_fields = owned(fields);
        self
    }

    pub fn sortable(mut self, fields: &[&str]) -> Self {
        self.sortable_fields = Some(owned(fields));
        self
    }

    pub fn selectable(mut self, fields: &[&str]) -> Self {
        self.selectable_fields = owned(fields);
        self
    }

    pub fn field_type(mut self, field: &str, ty: FieldType) -> Self {
        self.field_types.insert(field.to_string(), ty);
        self
    }

    pub fn limits(mut self, default_limit: u64, max_limit: u64) -> Self {
        self.default_limit = default_limit;
        self.max_limit = max_limit;
        self
    }

    pub fn default_sort(mut self, field: &str, direction: SortDirection) -> Self {
        self.default_sort = OrderBy::new(field, direction);
        self
    }

    pub fn allow_include(mut self, flag: &str, relation: RelationSpec) -> Self {
        self.dynamic_include_whitelist
            .insert(flag.to_string(), relation);
        self
    }

    pub fn is_filterable(&self, field: &str) -> bool {
        self.filterable_fields.iter().any(|f| f == field)
    }

    /// Declared type of a field, if any.
    pub fn declared_type(&self, field: &str) -> Option<&FieldType> {
        self.field_types.get(field)
    }

    /// Searchable fields that hold text. A field declared with any other
    /// type cannot take a substring match and is skipped.
    pub fn text_search_fields(&self) -> Vec<String> {
        self.searchable_fields
            .iter()
            .filter(|field| {
                self.declared_type(field)
                    .is_none_or(|ty| *ty == FieldType::Text)
            })
            .cloned()
            .collect()
    }

    /// Whether `field` may be used for ordering. Relation paths never are.
    pub fn is_sortable(&self, field: &str) -> bool {
        if field.contains('.') {
            return false;
        }
        match &self.sortable_fields {
            Some(allowed) => allowed.iter().any(|f| f == field),
            None => {
                self.is_filterable(field) || self.searchable_fields.iter().any(|f| f == field)
            }
        }
    }

    /// Fields `fields=` may select, in declaration order. Relation paths are
    /// never projectable.
    pub fn projection_allow_list(&self) -> Vec<&str> {
        if !self.selectable_fields.is_empty() {
            return self.selectable_fields.iter().map(String::as_str).collect();
        }
        let declared = self
            .searchable_fields
            .iter()
            .chain(&self.filterable_fields)
            .chain(self.sortable_fields.iter().flatten())
            .chain(std::iter::once(&self.default_sort.field));
        let mut out: Vec<&str> = Vec::new();
        for field in declared {
            if !field.contains('.') && !out.contains(&field.as_str()) {
                out.push(field.as_str());
            }
        }
        out
    }

    /// Upper page-size bound, never below 1.
    pub fn effective_max_limit(&self) -> u64 {
        self.max_limit.max(1)
    }

    /// Default page size clamped into `[1, effective_max_limit]`.
    pub fn effective_default_limit(&self) -> u64 {
        self.default_limit.clamp(1, self.effective_max_limit())
    }
}
