//! In-process store delegate over JSON records.
//!
//! Records carry their relations embedded (`{"user": {...}, "reviews": [...]}`).
//! Predicates evaluate with the same semantics the SQL backend has:
//! - dotted paths walk into embedded relations; an array matches when any
//!   element matches
//! - missing and `null` values never satisfy a comparison
//! - ordering puts nulls last ascending and first descending

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use uuid::Uuid;

use super::store::QueryStore;
use super::types::{
    CompiledQuerySpec, Condition, CountSpec, EntitySchema, FilterOperator, FilterValue,
    IncludeTree, Predicate, SortDirection,
};

/// Read-only store over a fixed set of records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Vec<Value>,
    relations: IncludeTree,
}

impl MemoryStore {
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records,
            relations: IncludeTree::new(),
        }
    }

    /// Declare which record keys are relations. Relations are only returned
    /// when the query includes them.
    pub fn with_schema(mut self, schema: EntitySchema) -> Self {
        self.relations = schema.relations;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn matching<'a>(&'a self, filter: Option<&'a Predicate>) -> impl Iterator<Item = &'a Value> {
        self.records
            .iter()
            .filter(move |record| filter.is_none_or(|predicate| matches(record, predicate)))
    }
}

#[async_trait]
impl QueryStore for MemoryStore {
    type Record = Value;

    async fn find_many(&self, spec: &CompiledQuerySpec) -> Result<Vec<Value>> {
        let filter = spec.filter();
        let mut rows: Vec<&Value> = self.matching(filter.as_ref()).collect();

        if let Some(order_by) = &spec.order_by {
            rows.sort_by(|a, b| {
                let ordering = compare_nullable(a.get(&order_by.field), b.get(&order_by.field));
                match order_by.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let skip = usize::try_from(spec.skip).unwrap_or(usize::MAX);
        let take = spec
            .take
            .map_or(usize::MAX, |take| usize::try_from(take).unwrap_or(usize::MAX));

        Ok(rows
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|record| {
                shape(
                    record,
                    spec.select.as_deref(),
                    &spec.include,
                    &self.relations,
                )
            })
            .collect())
    }

    async fn count(&self, spec: &CountSpec) -> Result<u64> {
        Ok(self.matching(spec.filter.as_ref()).count() as u64)
    }
}

fn matches(record: &Value, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Condition(condition) => resolve(record, &condition.field)
            .into_iter()
            .any(|value| satisfies(value, condition)),
        Predicate::And(children) => children.iter().all(|child| matches(record, child)),
        Predicate::Or(children) => children.iter().any(|child| matches(record, child)),
        Predicate::Not(inner) => !matches(record, inner),
    }
}

/// Every non-null value reachable by a dotted path, flattening arrays.
fn resolve<'v>(record: &'v Value, path: &str) -> Vec<&'v Value> {
    let mut current = vec![record];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value.get(segment) {
                Some(Value::Array(items)) => next.extend(items.iter().filter(|v| !v.is_null())),
                Some(Value::Null) | None => {}
                Some(other) => next.push(other),
            }
        }
        current = next;
    }
    current
}

fn satisfies(value: &Value, condition: &Condition) -> bool {
    let expected = &condition.value;
    match condition.operator {
        FilterOperator::Equals => equals(value, expected),
        FilterOperator::Not => !equals(value, expected),
        FilterOperator::Contains => {
            let (Some(haystack), Some(needle)) = (value.as_str(), expected.as_string()) else {
                return false;
            };
            if condition.case_insensitive {
                haystack.to_lowercase().contains(&needle.to_lowercase())
            } else {
                haystack.contains(&needle)
            }
        }
        FilterOperator::GreaterThan => order(value, expected) == Some(Ordering::Greater),
        FilterOperator::GreaterOrEqual => matches!(
            order(value, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOperator::LessThan => order(value, expected) == Some(Ordering::Less),
        FilterOperator::LessOrEqual => matches!(
            order(value, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOperator::In => match expected {
            FilterValue::List(items) => items.iter().any(|item| equals(value, item)),
            _ => false,
        },
        FilterOperator::NotIn => match expected {
            FilterValue::List(items) => !items.iter().any(|item| equals(value, item)),
            _ => false,
        },
    }
}

/// Equality with SQL-style literal coercion: a text literal compared to a
/// number or boolean column is read as that type.
fn equals(value: &Value, expected: &FilterValue) -> bool {
    match expected {
        FilterValue::String(s) => match value {
            Value::String(v) => v == s,
            Value::Number(n) => s.parse::<f64>().ok() == n.as_f64(),
            Value::Bool(b) => s.parse::<bool>().ok() == Some(*b),
            _ => false,
        },
        FilterValue::Integer(_) | FilterValue::Float(_) => {
            value.as_f64().is_some() && value.as_f64() == expected.as_f64()
        }
        FilterValue::Boolean(b) => value.as_bool() == Some(*b),
        FilterValue::Uuid(u) => value
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .is_some_and(|v| v == *u),
        FilterValue::List(_) => false,
    }
}

fn order(value: &Value, expected: &FilterValue) -> Option<Ordering> {
    match expected {
        FilterValue::Integer(_) | FilterValue::Float(_) => {
            value.as_f64()?.partial_cmp(&expected.as_f64()?)
        }
        FilterValue::String(s) => Some(value.as_str()?.cmp(s.as_str())),
        _ => None,
    }
}

fn compare_nullable(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Apply projection and inclusion to one record.
///
/// `known` lists the relations at this level; those absent from `include`
/// are removed. Included relations are shaped recursively.
fn shape(
    record: &Value,
    select: Option<&[String]>,
    include: &IncludeTree,
    known: &IncludeTree,
) -> Value {
    let Some(source) = record.as_object() else {
        return record.clone();
    };

    let mut out = Map::new();
    for (key, value) in source {
        if include.contains_key(key) {
            continue;
        }
        if known.contains_key(key) {
            continue;
        }
        if select.is_some_and(|columns| !columns.iter().any(|c| c == key)) {
            continue;
        }
        out.insert(key.clone(), value.clone());
    }

    for (name, relation) in include {
        let nested_known = known.get(name).map_or(&relation.include, |k| &k.include);
        let columns = relation.columns();
        let shape_child =
            |child: &Value| shape(child, columns.as_deref(), &relation.include, nested_known);

        let embedded = match source.get(name) {
            Some(Value::Array(children)) => Value::Array(children.iter().map(shape_child).collect()),
            Some(child @ Value::Object(_)) => shape_child(child),
            _ if relation.singular => Value::Null,
            _ => Value::Array(Vec::new()),
        };
        out.insert(name.clone(), embedded);
    }

    Value::Object(out)
}
