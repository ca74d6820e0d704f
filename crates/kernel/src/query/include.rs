//! Relation inclusion.
//!
//! Two layers: mandatory relations fixed per entity type, and optional ones a
//! client requests by flag name through the `includes` parameter.

use super::types::IncludeTree;

/// Add mandatory relations. These replace any same-named entry.
pub fn merge_mandatory(target: &mut IncludeTree, mandatory: &IncludeTree) {
    for (name, relation) in mandatory {
        target.insert(name.clone(), relation.clone());
    }
}

/// Resolve requested flags through the whitelist. Unknown flags are ignored.
pub fn resolve_dynamic(flags: &[String], whitelist: &IncludeTree) -> IncludeTree {
    flags
        .iter()
        .filter_map(|flag| match whitelist.get(flag) {
            Some(relation) => Some((flag.clone(), relation.clone())),
            None => {
                tracing::debug!(flag = %flag, "ignoring unknown include flag");
                None
            }
        })
        .collect()
}

/// Add optional relations without touching entries already present.
pub fn merge_optional(target: &mut IncludeTree, optional: IncludeTree) {
    for (name, relation) in optional {
        target.entry(name).or_insert(relation);
    }
}
