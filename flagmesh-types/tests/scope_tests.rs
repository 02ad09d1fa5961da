use flagmesh_types::ScopeMap;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn identity_is_insertion_order_independent() {
    let ab: ScopeMap = [("tenant", "t1"), ("component", "ui")].into_iter().collect();
    let ba: ScopeMap = [("component", "ui"), ("tenant", "t1")].into_iter().collect();
    assert_eq!(ab, ba);
    assert_eq!(ab.canonical_string(), ba.canonical_string());
}

#[test]
fn dimensions_iterate_sorted() {
    let map: ScopeMap = [("zone", "z"), ("app", "a"), ("tenant", "t")].into_iter().collect();
    let dims: Vec<&str> = map.dimensions().collect();
    assert_eq!(dims, vec!["app", "tenant", "zone"]);
}

#[test]
fn strict_conversion_rejects_non_string_values() {
    assert!(ScopeMap::from_value(&json!({"tenant": "t1"})).is_ok());
    assert!(ScopeMap::from_value(&json!({"tenant": 7})).is_err());
    assert!(ScopeMap::from_value(&json!(["tenant"])).is_err());
    assert!(ScopeMap::from_value(&json!("tenant")).is_err());
}

#[test]
fn sanitize_drops_non_string_entries() {
    let map = ScopeMap::sanitize(&json!({"tenant": "t1", "count": 3, "flag": true}));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("tenant"), Some("t1"));
}

#[test]
fn sanitize_of_non_object_is_empty() {
    assert!(ScopeMap::sanitize(&json!(17)).is_empty());
    assert!(ScopeMap::sanitize(&json!(null)).is_empty());
}

#[test]
fn serde_is_transparent() {
    let map: ScopeMap = [("tenant", "t1")].into_iter().collect();
    let wire = serde_json::to_string(&map).unwrap();
    assert_eq!(wire, r#"{"tenant":"t1"}"#);
    let back: ScopeMap = serde_json::from_str(&wire).unwrap();
    assert_eq!(back, map);
}
