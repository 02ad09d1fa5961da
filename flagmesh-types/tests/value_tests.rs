use flagmesh_types::{FlagType, FlagValue};
use pretty_assertions::assert_eq;

#[test]
fn values_serialize_as_plain_scalars() {
    assert_eq!(serde_json::to_string(&FlagValue::Boolean(true)).unwrap(), "true");
    assert_eq!(serde_json::to_string(&FlagValue::Number(2.5)).unwrap(), "2.5");
    assert_eq!(
        serde_json::to_string(&FlagValue::String("on".into())).unwrap(),
        "\"on\""
    );
}

#[test]
fn scalars_deserialize_to_matching_variant() {
    let b: FlagValue = serde_json::from_str("false").unwrap();
    assert_eq!(b, FlagValue::Boolean(false));

    let n: FlagValue = serde_json::from_str("42").unwrap();
    assert_eq!(n, FlagValue::Number(42.0));

    let s: FlagValue = serde_json::from_str("\"42\"").unwrap();
    assert_eq!(s, FlagValue::String("42".into()));
}

#[test]
fn structured_json_is_rejected() {
    assert!(serde_json::from_str::<FlagValue>("{\"a\":1}").is_err());
    assert!(serde_json::from_str::<FlagValue>("[1,2]").is_err());
}

#[test]
fn flag_type_matches_value() {
    assert!(FlagValue::from(true).has_type(FlagType::Boolean));
    assert!(FlagValue::from(1.5).has_type(FlagType::Number));
    assert!(FlagValue::from("x").has_type(FlagType::String));
    assert!(!FlagValue::from("true").has_type(FlagType::Boolean));
}

#[test]
fn flag_type_round_trips_through_name() {
    for t in [FlagType::Boolean, FlagType::Number, FlagType::String] {
        assert_eq!(t.name().parse::<FlagType>().unwrap(), t);
    }
    assert!("object".parse::<FlagType>().is_err());
}

#[test]
fn accessors_return_inner_values() {
    assert_eq!(FlagValue::from(true).as_bool(), Some(true));
    assert_eq!(FlagValue::from(3.0).as_number(), Some(3.0));
    assert_eq!(FlagValue::from("v").as_str(), Some("v"));
    assert_eq!(FlagValue::from("v").as_bool(), None);
}
