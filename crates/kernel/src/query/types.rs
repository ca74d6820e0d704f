//! List-query engine types.
//!
//! Provides type definitions for the request-driven query builder:
//! - ParsedParams: typed tokens extracted from a raw query string map
//! - Predicate: filter tree (AND/OR/NOT over leaf conditions)
//! - CompiledQuerySpec: what a store delegate is asked to fetch
//! - PageMeta / PagedResult: the paged response payload

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Raw query parameters as received by a route handler.
pub type QueryParams = HashMap<String, String>;

/// Outcome of parsing an integer query parameter.
///
/// Parsing never fails: malformed input becomes `Invalid` and is later
/// normalized to a default by the paginator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsedNumber {
    #[default]
    Missing,
    Invalid,
    Value(i64),
}

impl ParsedNumber {
    /// Parse an optional raw value. Surrounding whitespace is ignored.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Missing,
            Some(s) => s.parse::<i64>().map_or(Self::Invalid, Self::Value),
        }
    }

    /// The parsed value if it is a strictly positive integer.
    pub fn positive(self) -> Option<u64> {
        match self {
            Self::Value(n) if n > 0 => u64::try_from(n).ok(),
            _ => None,
        }
    }
}

/// Typed tokens extracted from [`QueryParams`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedParams {
    /// Free-text search term (trimmed, never empty).
    pub search_term: Option<String>,
    pub page: ParsedNumber,
    pub limit: ParsedNumber,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortDirection>,
    /// Requested projection, in request order, deduplicated.
    pub fields: Vec<String>,
    /// Requested optional relation flags, in request order, deduplicated.
    pub includes: Vec<String>,
    /// Every non-reserved key, sorted by key.
    pub filters: BTreeMap<String, String>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Accepts exactly `asc` or `desc`.
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Declared type of a filterable field, used for value coercion.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Integer,
    Float,
    Boolean,
    Uuid,
    /// Database enum; only the listed labels are valid values.
    Enum(Vec<String>),
}

impl FieldType {
    pub fn one_of(labels: &[&str]) -> Self {
        Self::Enum(labels.iter().map(|l| l.to_string()).collect())
    }

    /// Whether range operators compare values of this type meaningfully.
    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::Text | Self::Integer | Self::Float)
    }
}

/// Comparison operators for leaf conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Exact match.
    Equals,
    /// Not equal.
    Not,
    /// Substring match.
    Contains,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    /// Value in list.
    In,
    /// Value not in list.
    NotIn,
}

impl FilterOperator {
    /// Map a filter key suffix (`price__gte` → `gte`) to an operator.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "eq" => Some(Self::Equals),
            "not" => Some(Self::Not),
            "contains" => Some(Self::Contains),
            "gt" => Some(Self::GreaterThan),
            "gte" => Some(Self::GreaterOrEqual),
            "lt" => Some(Self::LessThan),
            "lte" => Some(Self::LessOrEqual),
            "in" => Some(Self::In),
            "nin" => Some(Self::NotIn),
            _ => None,
        }
    }

    pub fn is_range(self) -> bool {
        matches!(
            self,
            Self::GreaterThan | Self::GreaterOrEqual | Self::LessThan | Self::LessOrEqual
        )
    }

    pub fn is_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

/// Filter value types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    /// List of values (for In/NotIn operators).
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Convert to string representation.
    pub fn as_string(&self) -> Option<String> {
        match self {
            FilterValue::String(s) => Some(s.clone()),
            FilterValue::Integer(i) => Some(i.to_string()),
            FilterValue::Float(f) => Some(f.to_string()),
            FilterValue::Boolean(b) => Some(b.to_string()),
            FilterValue::Uuid(u) => Some(u.to_string()),
            FilterValue::List(_) => None,
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Integer(i) => Some(*i as f64),
            FilterValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

/// A single `{field, operator, value}` condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    /// Column name, or a dotted path through relations (`user.email`).
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
    /// Only meaningful for `Contains`.
    #[serde(default)]
    pub case_insensitive: bool,
}

/// Filter tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Condition(Condition),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn condition(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Predicate::Condition(Condition {
            field: field.into(),
            operator,
            value,
            case_insensitive: false,
        })
    }

    pub fn equals(field: impl Into<String>, value: FilterValue) -> Self {
        Self::condition(field, FilterOperator::Equals, value)
    }

    /// Case-insensitive substring match.
    pub fn contains(field: impl Into<String>, term: impl Into<String>) -> Self {
        Predicate::Condition(Condition {
            field: field.into(),
            operator: FilterOperator::Contains,
            value: FilterValue::String(term.into()),
            case_insensitive: true,
        })
    }

    pub fn and(children: Vec<Predicate>) -> Self {
        Predicate::And(children)
    }

    pub fn or(children: Vec<Predicate>) -> Self {
        Predicate::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Predicate) -> Self {
        Predicate::Not(Box::new(inner))
    }

    /// Every field referenced by a leaf of this tree.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Condition(c) => out.push(&c.field),
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
            Predicate::Not(inner) => inner.collect_fields(out),
        }
    }
}

/// Single-key ordering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Relation tree keyed by the name results are embedded under.
pub type IncludeTree = BTreeMap<String, RelationSpec>;

/// How to load one relation of a record.
///
/// Children are matched where `child.foreign_field = parent.local_field`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationSpec {
    /// Table holding the related rows.
    pub table: String,

    /// Field on the parent record.
    pub local_field: String,

    /// Field on the related record.
    pub foreign_field: String,

    /// Embed a single object (or null) instead of an array.
    #[serde(default)]
    pub singular: bool,

    /// Columns to return for the related rows (empty = all).
    #[serde(default)]
    pub fields: Vec<String>,

    /// Nested relations of the related rows.
    #[serde(default)]
    pub include: IncludeTree,
}

impl RelationSpec {
    /// One-to-many (or many-to-many through a join table) relation.
    pub fn many(
        table: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            singular: false,
            fields: Vec::new(),
            include: IncludeTree::new(),
        }
    }

    /// Relation resolving to at most one record.
    pub fn one(
        table: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
    ) -> Self {
        Self {
            singular: true,
            ..Self::many(table, local_field, foreign_field)
        }
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_include(mut self, name: impl Into<String>, relation: RelationSpec) -> Self {
        self.include.insert(name.into(), relation);
        self
    }

    /// Columns to load for related rows, `None` for all. A restricted list
    /// always carries the join key and the keys nested relations join on.
    pub fn columns(&self) -> Option<Vec<String>> {
        if self.fields.is_empty() {
            return None;
        }
        let mut columns = self.fields.clone();
        let join_keys = std::iter::once(&self.foreign_field)
            .chain(self.include.values().map(|nested| &nested.local_field));
        for key in join_keys {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        Some(columns)
    }
}

/// Storage-facing description of an entity: its table and every relation a
/// dotted field path may traverse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySchema {
    pub table: String,
    #[serde(default)]
    pub relations: IncludeTree,
}

impl EntitySchema {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            relations: IncludeTree::new(),
        }
    }

    pub fn with_relation(mut self, name: impl Into<String>, relation: RelationSpec) -> Self {
        self.relations.insert(name.into(), relation);
        self
    }
}

/// Accumulated read query, extended stage by stage and handed read-only to
/// the store delegate.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CompiledQuerySpec {
    /// AND-combined clauses. Stages only ever append.
    pub where_clause: Vec<Predicate>,
    pub order_by: Option<OrderBy>,
    pub skip: u64,
    pub take: Option<u64>,
    /// Returned columns (`None` = all).
    pub select: Option<Vec<String>>,
    pub include: IncludeTree,
}

impl CompiledQuerySpec {
    /// The combined filter, if any clause was added.
    pub fn filter(&self) -> Option<Predicate> {
        match self.where_clause.as_slice() {
            [] => None,
            [single] => Some(single.clone()),
            clauses => Some(Predicate::And(clauses.to_vec())),
        }
    }

    /// Where-only view used for the total count.
    pub fn count_spec(&self) -> CountSpec {
        CountSpec {
            filter: self.filter(),
        }
    }

    /// Reconcile projection with inclusion: a restricted `select` keeps every
    /// parent field a requested relation joins on.
    pub fn finalize(&mut self) {
        let Some(select) = self.select.as_mut() else {
            return;
        };
        for relation in self.include.values() {
            if !select.contains(&relation.local_field) {
                select.push(relation.local_field.clone());
            }
        }
    }
}

/// Count query: the data query's filter without ordering, paging,
/// projection or inclusion.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CountSpec {
    pub filter: Option<Predicate>,
}

/// Paging metadata returned alongside the data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Current page number (1-indexed).
    pub page: u64,
    /// Items per page.
    pub limit: u64,
    /// Total count (before paging).
    pub total: u64,
    /// Total number of pages.
    pub total_page: u64,
}

impl PageMeta {
    /// Create metadata with paging calculations.
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let limit = limit.max(1);
        Self {
            page,
            limit,
            total,
            total_page: total.div_ceil(limit),
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_page
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Result of executing a list query.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PagedResult<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}
