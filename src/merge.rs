use serde_json::{map::Entry as MapEntry, Map, Value};

/// The hierarchical mapping the pipeline assembles. With the `preserve_order`
/// feature of `serde_json` the map iterates in insertion order, which the final
/// key reordering of the assembler depends on.
pub type DocumentMap = Map<String, Value>;

/// Recursively merge a partial document fragment into an accumulator.
///
/// When both sides hold a mapping under the same key the merge recurses; for any
/// other conflict the fragment's value wins. Sequences count as scalars and are
/// replaced wholesale. This is a total function: no combination of inputs fails.
pub fn merge_into(accumulator: &mut DocumentMap, fragment: DocumentMap) {
    for (key, incoming) in fragment {
        match accumulator.entry(key) {
            MapEntry::Occupied(mut occupied) => match (occupied.get_mut(), incoming) {
                (Value::Object(existing), Value::Object(incoming)) => {
                    merge_into(existing, incoming);
                }
                (existing, incoming) => {
                    *existing = incoming;
                }
            },
            MapEntry::Vacant(vacant) => {
                vacant.insert(incoming);
            }
        }
    }
}

/// Rename a key of a mapping, moving the value stored under `old_key` to
/// `new_key` and overwriting anything already stored there.
///
/// A no-op when the two keys are equal or when `old_key` is absent, so re-keying
/// statistics results never drops or duplicates data. On the insertion-ordered
/// maps used throughout this crate the renamed key moves to the end of the map;
/// every key in between keeps its relative position.
pub fn replace_key(mapping: &mut DocumentMap, old_key: &str, new_key: &str) {
    if old_key == new_key {
        return;
    }
    if let Some(value) = mapping.shift_remove(old_key) {
        mapping.insert(new_key.to_string(), value);
    }
}

/// Run `replace_key` on the mapping stored under `key`, if there is one. The
/// statistics results nest per-field mappings inside the overall result, so the
/// extractors mostly re-key one level down.
pub fn replace_key_within(mapping: &mut DocumentMap, key: &str, old_key: &str, new_key: &str) {
    if let Some(Value::Object(inner)) = mapping.get_mut(key) {
        replace_key(inner, old_key, new_key);
    }
}

#[cfg(test)]
mod tests {
    use super::{merge_into, replace_key, DocumentMap};
    use serde_json::json;

    fn as_map(value: serde_json::Value) -> DocumentMap {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected a mapping, got {:?}", other),
        }
    }

    #[test]
    fn mappings_merge_recursively_and_scalars_take_the_fragment() {
        let mut accumulator = as_map(json!({
            "field": { "1": "hello", "2": "old" },
            "misc": { "ip": "203.0.113.4" }
        }));
        let fragment = as_map(json!({
            "field": { "2": "new", "3": "extra" },
            "pages": ["First page"]
        }));

        merge_into(&mut accumulator, fragment);

        similar_asserts::assert_eq!(
            serde_json::Value::Object(accumulator),
            json!({
                "field": { "1": "hello", "2": "new", "3": "extra" },
                "misc": { "ip": "203.0.113.4" },
                "pages": ["First page"]
            })
        );
    }

    #[test]
    fn sequences_are_replaced_wholesale() {
        let mut accumulator = as_map(json!({ "html": ["<p>one</p>"] }));
        merge_into(&mut accumulator, as_map(json!({ "html": ["<p>two</p>"] })));
        assert_eq!(accumulator["html"], json!(["<p>two</p>"]));
    }

    #[test]
    fn replace_key_moves_the_value_and_removes_the_old_key() {
        let mut mapping = as_map(json!({ "a": 1, "totals": { "score": 3 }, "z": 2 }));
        replace_key(&mut mapping, "totals", "misc");

        assert!(mapping.get("totals").is_none());
        assert_eq!(mapping["misc"], json!({ "score": 3 }));
        // The renamed key moves to the end, the untouched keys keep their order.
        let keys: Vec<_> = mapping.keys().cloned().collect();
        assert_eq!(keys, ["a", "z", "misc"]);
    }

    #[test]
    fn replace_key_is_a_no_op_for_equal_or_absent_keys() {
        let original = as_map(json!({ "a": 1, "b": 2 }));

        let mut same_key = original.clone();
        replace_key(&mut same_key, "a", "a");
        assert_eq!(same_key, original);

        let mut absent_key = original.clone();
        replace_key(&mut absent_key, "missing", "present");
        assert_eq!(absent_key, original);
    }

    #[test]
    fn replace_key_overwrites_an_existing_target() {
        let mut mapping = as_map(json!({ "code": "kept", "label": "clobbered" }));
        replace_key(&mut mapping, "code", "label");
        similar_asserts::assert_eq!(
            serde_json::Value::Object(mapping),
            json!({ "label": "kept" })
        );
    }
}
