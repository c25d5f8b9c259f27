//! Collection names derived from entity class markers.

use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::RwLock;
use tracing::debug;

use crate::entity::EntityClass;
use crate::error::{CoreError, CoreResult};

/// Derives collection names from table and namespace markers.
///
/// The class and its ancestors are walked depth-first, most derived first.
/// The first non-empty table name is the base name; when every table marker
/// is empty the base name is the class's simple name in snake case. The
/// first non-empty namespace becomes the prefix, joined with `_`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionNameResolver;

impl CollectionNameResolver {
    /// Computes the collection name of `class` without consulting the cache.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CollectionInitialization`] when neither the class
    /// nor any ancestor carries a table marker.
    pub fn resolve(class: &'static EntityClass) -> CoreResult<String> {
        let lineage = class.lineage();

        let mut tables = lineage.iter().filter_map(|c| c.table).peekable();
        if tables.peek().is_none() {
            return Err(CoreError::collection_initialization(format!(
                "table marker not found on entity class: {}",
                class.name
            )));
        }
        let base = tables
            .find(|t| !t.is_empty())
            .map_or_else(|| snake_case(class.simple_name()), str::to_string);

        let prefix = lineage
            .iter()
            .filter_map(|c| c.namespace)
            .find(|ns| !ns.is_empty());

        Ok(match prefix {
            Some(ns) if ns.ends_with('_') => format!("{ns}{base}"),
            Some(ns) => format!("{ns}_{base}"),
            None => base,
        })
    }
}

static NAMES: LazyLock<RwLock<HashMap<&'static str, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// The collection name of `class`, computed once per process.
///
/// # Errors
///
/// Same as [`CollectionNameResolver::resolve`]; failures are not cached.
pub fn collection_name(class: &'static EntityClass) -> CoreResult<String> {
    if let Some(name) = NAMES.read().get(class.name) {
        return Ok(name.clone());
    }
    let resolved = CollectionNameResolver::resolve(class)?;
    let mut names = NAMES.write();
    let name = names.entry(class.name).or_insert_with(|| {
        debug!(class = class.name, collection = %resolved, "Collection name cached");
        resolved.clone()
    });
    Ok(name.clone())
}

/// `TwoTwo` becomes `two_two`.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ClassForm;
    use proptest::prelude::*;

    static MARKED: EntityClass =
        EntityClass::new("name::SalesOrder", ClassForm::Trait).table("");

    static UNMARKED: EntityClass = EntityClass::new("name::Loose", ClassForm::Trait);

    #[test]
    fn derived_from_simple_name() {
        assert_eq!(CollectionNameResolver::resolve(&MARKED).unwrap(), "sales_order");
    }

    #[test]
    fn missing_marker_fails_with_class_name() {
        let err = CollectionNameResolver::resolve(&UNMARKED).unwrap_err();
        assert!(matches!(err, CoreError::CollectionInitialization { .. }));
        assert!(err.to_string().contains("name::Loose"));
        assert!(collection_name(&UNMARKED).is_err());
    }

    #[test]
    fn cached_name_is_stable() {
        let first = collection_name(&MARKED).unwrap();
        assert_eq!(collection_name(&MARKED).unwrap(), first);
    }

    #[test]
    fn snake_case_words() {
        assert_eq!(snake_case("One"), "one");
        assert_eq!(snake_case("TwoTwo"), "two_two");
        assert_eq!(snake_case("already"), "already");
    }

    proptest! {
        #[test]
        fn snake_case_is_lowercase_and_keeps_letters(name in "[A-Z][a-zA-Z]{0,20}") {
            let snake = snake_case(&name);
            prop_assert_eq!(snake.to_lowercase(), snake.clone());
            prop_assert_eq!(snake.replace('_', ""), name.to_lowercase());
            prop_assert!(!snake.starts_with('_'));
        }
    }
}
