//! Filter compilation.
//!
//! Every residual query key is a candidate filter. Keys may carry an operator
//! suffix (`appointment_fee__lte=500`). A key whose field is not allow-listed,
//! or whose value cannot be coerced to the field's type, is dropped on its
//! own without affecting the rest of the request.
//!
//! Values are coerced to the field's declared type (text when undeclared)
//! so a compiled comparison always matches the column type.

use std::collections::BTreeMap;
use uuid::Uuid;

use super::config::QueryConfig;
use super::params::split_list;
use super::types::{FieldType, FilterOperator, FilterValue, Predicate};

/// Separator between a field name and an operator suffix.
pub const OPERATOR_SEPARATOR: &str = "__";

static UNDECLARED: FieldType = FieldType::Text;

/// Compile residual key/value pairs into predicates to be AND-combined.
pub fn compile_filters(filters: &BTreeMap<String, String>, config: &QueryConfig) -> Vec<Predicate> {
    filters
        .iter()
        .filter_map(|(key, raw)| {
            let predicate = compile_filter(key, raw, config);
            if predicate.is_none() {
                tracing::debug!(key = %key, "dropping filter key");
            }
            predicate
        })
        .collect()
}

/// Split `field__op` into the field and its operator. Keys without a known
/// suffix are equality filters on the whole key.
pub fn split_operator(key: &str) -> (&str, FilterOperator) {
    if let Some((field, suffix)) = key.rsplit_once(OPERATOR_SEPARATOR)
        && !field.is_empty()
        && let Some(operator) = FilterOperator::from_suffix(suffix)
    {
        return (field, operator);
    }
    (key, FilterOperator::Equals)
}

fn compile_filter(key: &str, raw: &str, config: &QueryConfig) -> Option<Predicate> {
    let (field, operator) = split_operator(key);
    if !config.is_filterable(field) {
        return None;
    }

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let ty = config.declared_type(field).unwrap_or(&UNDECLARED);
    if operator.is_range() && !ty.is_ordered() {
        return None;
    }
    match operator {
        FilterOperator::Contains => match ty {
            FieldType::Text => Some(Predicate::contains(field, raw)),
            _ => None,
        },
        FilterOperator::In | FilterOperator::NotIn => {
            let items = split_list(raw);
            if items.is_empty() {
                return None;
            }
            let values = items
                .iter()
                .map(|item| coerce(item, ty))
                .collect::<Option<Vec<_>>>()?;
            Some(Predicate::condition(
                field,
                operator,
                FilterValue::List(values),
            ))
        }
        _ => {
            let value = coerce(raw, ty)?;
            Some(Predicate::condition(field, operator, value))
        }
    }
}

/// Coerce a raw string to a value of the field's type. Undeclared fields
/// are text, so the value is always bound with the column's own type.
fn coerce(raw: &str, ty: &FieldType) -> Option<FilterValue> {
    match ty {
        FieldType::Text => Some(FilterValue::String(raw.to_string())),
        FieldType::Integer => raw.parse().ok().map(FilterValue::Integer),
        FieldType::Float => parse_float(raw).map(FilterValue::Float),
        FieldType::Boolean => parse_bool(raw).map(FilterValue::Boolean),
        FieldType::Uuid => Uuid::parse_str(raw).ok().map(FilterValue::Uuid),
        FieldType::Enum(labels) => labels
            .iter()
            .find(|label| label.eq_ignore_ascii_case(raw))
            .map(|label| FilterValue::String(label.clone())),
    }
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
