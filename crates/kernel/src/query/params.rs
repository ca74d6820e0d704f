//! Query parameter tokenization.
//!
//! Splits a raw string map into reserved tokens and residual filter pairs.
//! Pure and infallible: anything malformed becomes "absent" or
//! [`ParsedNumber::Invalid`].

use std::collections::BTreeMap;

use super::types::{ParsedNumber, ParsedParams, QueryParams, SortDirection};

pub const SEARCH_TERM: &str = "searchTerm";
pub const PAGE: &str = "page";
pub const LIMIT: &str = "limit";
pub const SORT_BY: &str = "sortBy";
pub const SORT_ORDER: &str = "sortOrder";
pub const FIELDS: &str = "fields";
pub const INCLUDES: &str = "includes";

/// Keys never treated as filters.
pub const RESERVED_KEYS: [&str; 7] = [SEARCH_TERM, PAGE, LIMIT, SORT_BY, SORT_ORDER, FIELDS, INCLUDES];

/// Tokenize raw query parameters.
pub fn parse_params(raw: &QueryParams) -> ParsedParams {
    let get = |key: &str| raw.get(key).map(String::as_str);

    let filters: BTreeMap<String, String> = raw
        .iter()
        .filter(|(key, _)| !key.is_empty() && !RESERVED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    ParsedParams {
        search_term: non_empty(get(SEARCH_TERM)),
        page: ParsedNumber::parse(get(PAGE)),
        limit: ParsedNumber::parse(get(LIMIT)),
        sort_by: non_empty(get(SORT_BY)),
        sort_order: get(SORT_ORDER).and_then(|s| SortDirection::from_param(s.trim())),
        fields: get(FIELDS).map(split_list).unwrap_or_default(),
        includes: get(INCLUDES).map(split_list).unwrap_or_default(),
        filters,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Split a comma-separated list, trimming entries and dropping empties and
/// duplicates while keeping first-seen order.
pub fn split_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn reserved_keys_are_extracted() {
        let parsed = parse_params(&params(&[
            ("searchTerm", " john "),
            ("page", "2"),
            ("limit", "10"),
            ("sortBy", "name"),
            ("sortOrder", "desc"),
            ("fields", "name,email"),
            ("includes", "specialties"),
            ("specialization", "cardio"),
        ]));

        assert_eq!(parsed.search_term.as_deref(), Some("john"));
        assert_eq!(parsed.page, ParsedNumber::Value(2));
        assert_eq!(parsed.limit, ParsedNumber::Value(10));
        assert_eq!(parsed.sort_by.as_deref(), Some("name"));
        assert_eq!(parsed.sort_order, Some(SortDirection::Desc));
        assert_eq!(parsed.fields, vec!["name", "email"]);
        assert_eq!(parsed.includes, vec!["specialties"]);
        assert_eq!(parsed.filters.len(), 1);
        assert_eq!(parsed.filters["specialization"], "cardio");
    }

    #[test]
    fn malformed_values_become_absent() {
        let parsed = parse_params(&params(&[
            ("searchTerm", "   "),
            ("page", "two"),
            ("sortBy", ""),
            ("sortOrder", "sideways"),
        ]));

        assert!(parsed.search_term.is_none());
        assert_eq!(parsed.page, ParsedNumber::Invalid);
        assert_eq!(parsed.limit, ParsedNumber::Missing);
        assert!(parsed.sort_by.is_none());
        assert!(parsed.sort_order.is_none());
        assert!(parsed.filters.is_empty());
    }

    #[test]
    fn empty_input() {
        assert_eq!(parse_params(&QueryParams::new()), ParsedParams::default());
    }

    #[test]
    fn split_list_trims_and_dedupes() {
        assert_eq!(split_list(" a, b ,,a,c ,"), vec!["a", "b", "c"]);
        assert!(split_list(" , ").is_empty());
    }
}
