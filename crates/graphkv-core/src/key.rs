//! Key encoding (spec §3).
//!
//! All keys share one flat KV namespace; these functions are the single
//! source of truth for every prefix used across the entity, index, and
//! relationship engines. Nothing outside this module should hand-assemble
//! a key string.

/// Prefix under which every index declaration lives.
pub const INDEX_DECL_PREFIX: &str = "idx:";

/// Prefix under which every relationship neighbor-set key lives.
pub const RELATIONSHIP_PREFIX: &str = "relationship$";

/// Prefix under which every relationship name-mapping row lives.
pub const RELATIONSHIP_NAME_PREFIX: &str = "relationship-name$";

/// `idx:<property>` — the id of an index declaration over `property`.
#[must_use]
pub fn index_decl_id(property: &str) -> String {
    format!("{INDEX_DECL_PREFIX}{property}")
}

/// `<property>--<propertyValue>` — the storage key of one index entry.
#[must_use]
pub fn index_entry_key(property: &str, value: &str) -> String {
    format!("{property}--{value}")
}

/// `<property>--` — the prefix under which every entry of one index lives,
/// used by `listQuery` when a request supplies `index` without `key`.
#[must_use]
pub fn index_prefix(property: &str) -> String {
    format!("{property}--")
}

/// `relationship$<node>$<relName>` — the neighbor-set key for one node under
/// one directional relationship name.
#[must_use]
pub fn relationship_set_key(node: &str, rel_name: &str) -> String {
    format!("{RELATIONSHIP_PREFIX}{node}${rel_name}")
}

/// `relationship-name$<relName>` — the inverse-name mapping row for one
/// directional relationship name.
#[must_use]
pub fn relationship_name_key(rel_name: &str) -> String {
    format!("{RELATIONSHIP_NAME_PREFIX}{rel_name}")
}

/// Split a `relationship$<node>$<relName>` key back into `(node, relName)`.
/// Returns `None` for any key that isn't shaped like a relationship set key.
#[must_use]
pub fn parse_relationship_set_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix(RELATIONSHIP_PREFIX)?;
    let (node, rel_name) = rest.split_once('$')?;
    Some((node, rel_name))
}

/// Strip the `idx:` prefix off an index declaration id, returning the
/// indexed property name.
#[must_use]
pub fn property_from_index_decl_id(id: &str) -> Option<&str> {
    id.strip_prefix(INDEX_DECL_PREFIX)
}

/// True for any key that belongs to the index-declaration or relationship
/// subsystems rather than to an entity. A prefixless `listQuery` scans the
/// whole flat namespace, so it must skip these rows itself — otherwise an
/// index declaration like `idx:a` (a valid `{id, property}` JSON object)
/// would decode as an entity and masquerade as one under its own id.
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with(INDEX_DECL_PREFIX)
        || key.starts_with(RELATIONSHIP_PREFIX)
        || key.starts_with(RELATIONSHIP_NAME_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_set_key_round_trips() {
        let key = relationship_set_key("a", "parent");
        assert_eq!(key, "relationship$a$parent");
        assert_eq!(parse_relationship_set_key(&key), Some(("a", "parent")));
    }

    #[test]
    fn index_decl_id_and_property_round_trip() {
        let id = index_decl_id("a");
        assert_eq!(id, "idx:a");
        assert_eq!(property_from_index_decl_id(&id), Some("a"));
    }
}
