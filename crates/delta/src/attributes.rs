//! Formatting attributes attached to inserts and retains.
//!
//! Attributes are a flat map from name to JSON value. A `null` value inside
//! a retain means "remove this attribute" from the content it covers.

use serde_json::Value;
use std::collections::BTreeMap;

/// Formatting attributes (`bold`, `italic`, `color`, ...).
pub type AttributeMap = BTreeMap<String, Value>;

/// Drop empty maps so that "no attributes" has a single representation.
pub(crate) fn normalize(attributes: Option<AttributeMap>) -> Option<AttributeMap> {
    attributes.filter(|map| !map.is_empty())
}

/// Compose attribute map `b` on top of `a`.
///
/// Keys in `b` win. When `keep_null` is false (landing on inserted content)
/// `null` values are removed instead of being carried along.
pub fn compose(
    a: Option<&AttributeMap>,
    b: Option<&AttributeMap>,
    keep_null: bool,
) -> Option<AttributeMap> {
    let mut out: AttributeMap = b
        .into_iter()
        .flatten()
        .filter(|(_, value)| keep_null || !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    for (key, value) in a.into_iter().flatten() {
        if b.map_or(true, |b| !b.contains_key(key)) {
            out.insert(key.clone(), value.clone());
        }
    }

    normalize(Some(out))
}
