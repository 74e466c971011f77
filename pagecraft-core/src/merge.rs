//! Config merging - variant defaults overlaid with instance overrides.
//!
//! Objects merge key by key, recursively. Scalars, `null` and arrays in the
//! override replace the base wholesale. Keys missing from the override keep
//! their base value. Inputs are never mutated.
//!
//! Responsive records (`{desktop, tablet?, mobile?}`) are atomic where the
//! config schema declares a responsive field (`grid.columns`, `text.titleSize`,
//! ...). The typed sections (`display`, `visibility`, ...) always merge field
//! by field, even when a patch only names viewport keys. Anywhere else, such
//! as inside `custom`, a base value that is already keyed by viewport is
//! replaced whole; any other object merges.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

/// A partial config: only the keys an instance or a variant overrides.
pub type ConfigPatch = Map<String, Value>;

/// `(section, field)` pairs typed as `Responsive<T>` in [`crate::BlockConfig`].
const RESPONSIVE_FIELDS: &[(&str, &str)] = &[
    ("image", "aspectRatio"),
    ("text", "titleSize"),
    ("text", "excerptSize"),
    ("grid", "columns"),
    ("grid", "gap"),
    ("card", "padding"),
    ("spacing", "padding"),
    ("spacing", "margin"),
];

/// Top-level config sections backed by a struct.
const STRUCT_SECTIONS: &[&str] = &[
    "display",
    "image",
    "text",
    "grid",
    "card",
    "spacing",
    "border",
    "animation",
    "visibility",
];

/// Where in the config tree a key sits.
#[derive(Debug, Clone, Copy)]
enum Level<'a> {
    Root,
    Section(&'a str),
    Free,
}

impl<'a> Level<'a> {
    fn child(self, key: &'a str) -> Self {
        match self {
            Self::Root => Self::Section(key),
            Self::Section(_) | Self::Free => Self::Free,
        }
    }

    fn mergeable(self, key: &str, base: &Value, overrides: &Value) -> bool {
        let (Value::Object(base), Value::Object(_)) = (base, overrides) else {
            return false;
        };
        match self {
            Self::Root if STRUCT_SECTIONS.contains(&key) => true,
            Self::Section(section) if RESPONSIVE_FIELDS.contains(&(section, key)) => false,
            Self::Root | Self::Section(_) | Self::Free => !is_viewport_keyed(base),
        }
    }
}

/// Non-empty and keyed only by viewport names.
fn is_viewport_keyed(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map
            .keys()
            .all(|k| matches!(k.as_str(), "desktop" | "tablet" | "mobile"))
}

/// Merge `overrides` onto `base`, returning a new value.
#[must_use]
pub fn merge_values(base: &Value, overrides: &Value) -> Value {
    let mut out = base.clone();
    merge_into(&mut out, overrides);
    out
}

/// Merge `overrides` onto the config root `target` in place.
pub fn merge_into(target: &mut Value, overrides: &Value) {
    match (target, overrides) {
        (Value::Object(t_map), Value::Object(o_map)) => merge_maps(t_map, o_map, Level::Root),
        (t, o) => *t = o.clone(),
    }
}

fn merge_maps(target: &mut Map<String, Value>, overrides: &Map<String, Value>, level: Level<'_>) {
    for (key, value) in overrides {
        match target.get_mut(key) {
            Some(existing) if level.mergeable(key, existing, value) => {
                if let (Value::Object(t_map), Value::Object(o_map)) = (existing, value) {
                    merge_maps(t_map, o_map, level.child(key));
                }
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Merge two patches; keys in `later` win, nested objects merge.
#[must_use]
pub fn merge_patches(earlier: &ConfigPatch, later: &ConfigPatch) -> ConfigPatch {
    let mut out = earlier.clone();
    merge_maps(&mut out, later, Level::Root);
    out
}

/// Overlay a patch onto a typed config and read it back.
///
/// # Errors
///
/// Returns [`CoreError::InvalidConfig`] if the merged tree no longer fits `T`,
/// e.g. an override put a string where a number belongs.
pub fn merge_typed<T>(base: &T, patch: &ConfigPatch) -> CoreResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut tree = serde_json::to_value(base)?;
    if let Value::Object(map) = &mut tree {
        merge_maps(map, patch, Level::Root);
    } else {
        return Err(CoreError::InvalidConfig(
            "base config is not an object".to_string(),
        ));
    }
    serde_json::from_value(tree).map_err(|e| CoreError::InvalidConfig(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_nested_objects_merge() {
        let base = json!({"display": {"showImage": true, "showDate": true}, "card": {"radius": 4}});
        let over = json!({"display": {"showDate": false}});
        let merged = merge_values(&base, &over);
        assert_eq!(
            merged,
            json!({"display": {"showImage": true, "showDate": false}, "card": {"radius": 4}})
        );
    }

    #[test]
    fn test_arrays_replace_atomically() {
        let base = json!({"ids": [1, 2, 3]});
        let over = json!({"ids": [9]});
        assert_eq!(merge_values(&base, &over), json!({"ids": [9]}));
    }

    #[test]
    fn test_responsive_records_replace_atomically() {
        let base = json!({"grid": {"columns": {"desktop": 4, "tablet": 2, "mobile": 1}}});
        let over = json!({"grid": {"columns": {"desktop": 3}}});
        assert_eq!(
            merge_values(&base, &over),
            json!({"grid": {"columns": {"desktop": 3}}})
        );
    }

    #[test]
    fn test_viewport_keys_merge_into_visibility() {
        let base = json!({"visibility": {"requireLogin": true, "startAt": "2024-01-01T00:00:00Z"}});
        let over = json!({"visibility": {"desktop": false}});
        assert_eq!(
            merge_values(&base, &over),
            json!({"visibility": {"requireLogin": true, "startAt": "2024-01-01T00:00:00Z", "desktop": false}})
        );

        let base = json!({"visibility": {"desktop": false}});
        let over = json!({"visibility": {"requireLogin": true}});
        assert_eq!(
            merge_values(&base, &over),
            json!({"visibility": {"desktop": false, "requireLogin": true}})
        );
    }

    #[test]
    fn test_custom_values_replace_only_viewport_keyed_bases() {
        let base = json!({"custom": {"speed": {"desktop": 50, "mobile": 20}}});
        let over = json!({"custom": {"speed": {"desktop": 30}}});
        assert_eq!(
            merge_values(&base, &over),
            json!({"custom": {"speed": {"desktop": 30}}})
        );

        let base = json!({"custom": {"embed": {"url": "https://example.com"}}});
        let over = json!({"custom": {"embed": {"desktop": true}}});
        assert_eq!(
            merge_values(&base, &over),
            json!({"custom": {"embed": {"url": "https://example.com", "desktop": true}}})
        );
    }

    #[test]
    fn test_scalar_over_object_replaces() {
        let base = json!({"background": {"type": "color", "color": "#fff"}});
        let over = json!({"background": null});
        assert_eq!(merge_values(&base, &over), json!({"background": null}));
    }

    #[test]
    fn test_inputs_are_untouched() {
        let base = json!({"a": {"b": 1}});
        let over = json!({"a": {"c": 2}});
        let before = (base.clone(), over.clone());
        let _ = merge_values(&base, &over);
        assert_eq!((base, over), before);
    }

    #[test]
    fn test_empty_override_is_a_copy() {
        let base = json!({"a": {"b": [1, 2]}, "c": "x"});
        assert_eq!(merge_values(&base, &json!({})), base);
    }

    #[test]
    fn test_merge_patches_keeps_earlier_siblings() {
        let earlier = json!({"display": {"showImage": false}, "custom": {"speed": 3}});
        let later = json!({"display": {"showTitle": false}});
        let (Value::Object(a), Value::Object(b)) = (earlier, later) else {
            unreachable!()
        };
        let merged = merge_patches(&a, &b);
        assert_eq!(
            Value::Object(merged),
            json!({"display": {"showImage": false, "showTitle": false}, "custom": {"speed": 3}})
        );
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::from),
        ]
    }

    fn tree() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 24, 4, |inner| {
            prop::collection::btree_map("[a-e]", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect()))
        })
    }

    proptest! {
        #[test]
        fn prop_merging_empty_is_identity(base in tree()) {
            prop_assert_eq!(merge_values(&base, &json!({})), if base.is_object() { base.clone() } else { json!({}) });
        }

        #[test]
        fn prop_merging_twice_is_idempotent(base in tree(), over in tree()) {
            let once = merge_values(&base, &over);
            let twice = merge_values(&once, &over);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_disjoint_overrides_compose(x in any::<i64>(), y in any::<i64>(), base in tree()) {
            let b = json!({"left": {"value": x}});
            let c = json!({"right": {"value": y}});
            let sequential = merge_values(&merge_values(&base, &b), &c);
            let combined = merge_values(&base, &merge_values(&b, &c));
            prop_assert_eq!(sequential, combined);
        }
    }
}
