use flagmesh_types::{ChangeEntry, ChangeOptions, FlagValue, ScopeMap, ValidationError};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn tombstone_serializes_new_value_as_null() {
    let entry = ChangeEntry::new("/f", None);
    let wire = serde_json::to_value(&entry).unwrap();
    assert_eq!(wire, json!({"featureKey": "/f", "newValue": null}));
    assert!(entry.is_tombstone());
}

#[test]
fn scoped_entry_round_trips() {
    let scope: ScopeMap = [("tenant", "t1")].into_iter().collect();
    let entry = ChangeEntry::new("/f", Some(FlagValue::Boolean(true)))
        .with_scope_map(&scope)
        .with_options(ChangeOptions {
            clear_sub_scopes: true,
            remote_only: false,
        });

    let wire = serde_json::to_string(&entry).unwrap();
    let back: ChangeEntry = serde_json::from_str(&wire).unwrap();
    assert_eq!(back, entry);
    assert_eq!(back.scope_map, Some(json!({"tenant": "t1"})));
}

#[test]
fn default_options_serialize_empty() {
    let wire = serde_json::to_value(ChangeOptions::default()).unwrap();
    assert_eq!(wire, json!({}));
    assert!(ChangeOptions::default().is_default());
}

#[test]
fn entry_with_non_string_scope_still_decodes() {
    // The scope map stays untyped on the wire; validation reports the
    // bad dimension instead of the decoder dropping the whole entry.
    let entry: ChangeEntry =
        serde_json::from_str(r#"{"featureKey": "/f", "newValue": 1, "scopeMap": {"tenant": 7}}"#)
            .unwrap();
    assert_eq!(entry.scope_map, Some(json!({"tenant": 7})));
}

#[test]
fn validation_error_renders_positional_template() {
    let err = ValidationError::new("/f", "value \"{0}\" does not match type {1}")
        .with_values(vec![json!(42), json!("string")])
        .with_scope_key("tenant::t1");
    assert_eq!(err.render(), "value \"42\" does not match type string");
    assert_eq!(err.to_string(), "/f: value \"42\" does not match type string (scope tenant::t1)");
}

#[test]
fn validation_error_without_values_renders_verbatim() {
    let err = ValidationError::new("/f", "feature key is not valid");
    assert_eq!(err.render(), "feature key is not valid");
}
