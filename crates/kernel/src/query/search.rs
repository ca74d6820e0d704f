//! Search term compilation.

use super::types::Predicate;

/// OR of one case-insensitive `contains` per searchable field, in declared
/// order. `None` when there is nothing to search.
pub fn compile_search(term: Option<&str>, fields: &[String]) -> Option<Predicate> {
    let term = term.map(str::trim).filter(|t| !t.is_empty())?;
    if fields.is_empty() {
        return None;
    }

    Some(Predicate::or(
        fields
            .iter()
            .map(|field| Predicate::contains(field.as_str(), term))
            .collect(),
    ))
}
