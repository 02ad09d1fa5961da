//! Validation pipeline behavior through the public engine API.

use async_trait::async_trait;
use flagmesh_engine::{messages, Engine, EngineConfig, EngineError, FeatureValidator};
use flagmesh_store::MemoryStore;
use flagmesh_types::{
    DefinitionSpec, FlagType, FlagValue, ScopeMap, ValidationError, ValidationRule,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

fn bool_spec(fallback: bool) -> DefinitionSpec {
    DefinitionSpec {
        flag_type: FlagType::Boolean,
        fallback_value: FlagValue::Boolean(fallback),
        active: true,
        app_url: None,
        validations: Vec::new(),
    }
}

fn string_spec(fallback: &str) -> DefinitionSpec {
    DefinitionSpec {
        flag_type: FlagType::String,
        fallback_value: FlagValue::String(fallback.to_string()),
        active: true,
        app_url: None,
        validations: Vec::new(),
    }
}

async fn engine_with(definitions: BTreeMap<String, DefinitionSpec>) -> (Engine, Arc<MemoryStore>) {
    let engine = Engine::new(EngineConfig {
        runtime_definitions: definitions,
        ..EngineConfig::default()
    });
    let store = Arc::new(MemoryStore::new());
    engine.initialize(store.clone()).await.unwrap();
    (engine, store)
}

fn scope(pairs: &[(&str, &str)]) -> ScopeMap {
    pairs.iter().map(|(d, v)| (d.to_string(), v.to_string())).collect()
}

#[tokio::test]
async fn unknown_key_yields_single_error_and_no_store_write() {
    let (engine, store) = engine_with(BTreeMap::new()).await;
    let version_before = store.version_of("flagmesh:values");

    let errors = engine
        .change_value("nope", Some(FlagValue::Boolean(true)), None, None)
        .await
        .unwrap();

    assert_eq!(errors, vec![ValidationError::new("nope", messages::KEY_INVALID)]);
    assert_eq!(errors[0].error_message, "feature key is not valid");
    assert_eq!(store.version_of("flagmesh:values"), version_before);
}

#[tokio::test]
async fn uninitialized_engine_reports_validation_error() {
    let engine = Engine::new(EngineConfig::default());
    let errors = engine
        .change_value("darkMode", Some(FlagValue::Boolean(true)), None, None)
        .await
        .unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_message, messages::NOT_INITIALIZED);
}

#[tokio::test]
async fn remote_only_rejected_for_locally_configured_key() {
    let mut defs = BTreeMap::new();
    defs.insert("darkMode".to_string(), bool_spec(false));
    let (engine, _) = engine_with(defs).await;

    let errors = engine
        .change_value(
            "darkMode",
            Some(FlagValue::Boolean(true)),
            None,
            Some(flagmesh_types::ChangeOptions {
                remote_only: true,
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    assert_eq!(errors[0].error_message, messages::REMOTE_ONLY_ON_LOCAL_KEY);
}

#[tokio::test]
async fn scope_dimension_outside_whitelist_rejected() {
    let mut spec = bool_spec(false);
    spec.validations = vec![ValidationRule::Scopes {
        scopes: vec!["tenant".to_string()],
    }];
    let mut defs = BTreeMap::new();
    defs.insert("darkMode".to_string(), spec);
    let (engine, _) = engine_with(defs).await;

    let errors = engine
        .change_value(
            "darkMode",
            Some(FlagValue::Boolean(true)),
            Some(&scope(&[("user", "u1")])),
            None,
        )
        .await
        .unwrap();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_message, messages::SCOPE_NOT_ALLOWED);
    assert_eq!(errors[0].error_message_values[0], json!("user"));
    assert_eq!(
        errors[0].render(),
        "scope dimension \"user\" is not allowed, must be one of tenant"
    );
}

#[tokio::test]
async fn wrong_value_type_rejected_with_both_type_names() {
    let mut defs = BTreeMap::new();
    defs.insert("darkMode".to_string(), bool_spec(false));
    let (engine, _) = engine_with(defs).await;

    let errors = engine
        .change_value("darkMode", Some(FlagValue::Number(3.0)), None, None)
        .await
        .unwrap();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_message, messages::WRONG_TYPE);
    assert_eq!(
        errors[0].error_message_values,
        vec![json!("3"), json!("number"), json!("boolean")]
    );
}

#[tokio::test]
async fn regex_rule_rejects_non_matching_value() {
    let mut spec = string_spec("eu-west");
    spec.validations = vec![ValidationRule::Regex {
        regex: "^(eu|us)-".to_string(),
    }];
    let mut defs = BTreeMap::new();
    defs.insert("region".to_string(), spec);
    let (engine, _) = engine_with(defs).await;

    let errors = engine
        .change_value("region", Some(FlagValue::String("apac-1".to_string())), None, None)
        .await
        .unwrap();
    assert_eq!(errors[0].error_message, messages::REGEX_MISMATCH);

    let errors = engine
        .change_value("region", Some(FlagValue::String("us-east".to_string())), None, None)
        .await
        .unwrap();
    assert!(errors.is_empty());
}

#[tokio::test]
async fn inactive_key_rejects_changes_and_resets() {
    let mut spec = bool_spec(false);
    spec.active = false;
    let mut defs = BTreeMap::new();
    defs.insert("legacyFlow".to_string(), spec);
    let (engine, _) = engine_with(defs).await;

    let errors = engine
        .change_value("legacyFlow", Some(FlagValue::Boolean(true)), None, None)
        .await
        .unwrap();
    assert_eq!(errors[0].error_message, messages::KEY_INACTIVE);

    // Removals are writes too; an inactive key ignores them as well.
    let errors = engine.reset_value("legacyFlow").await.unwrap();
    assert_eq!(errors[0].error_message, messages::KEY_INACTIVE);
}

#[tokio::test]
async fn inactive_key_rejects_inbound_change_entries() {
    let mut spec = bool_spec(false);
    spec.active = false;
    let mut defs = BTreeMap::new();
    defs.insert("legacyFlow".to_string(), spec);
    let (engine, _) = engine_with(defs).await;

    // A peer's batch runs through the same validation as a local call.
    engine
        .handle_message(r#"[{"featureKey":"legacyFlow","newValue":true}]"#)
        .await;

    assert_eq!(engine.get_value("legacyFlow", None).await, Some(FlagValue::Boolean(false)));
    let info = engine.get_info("legacyFlow").await.unwrap();
    assert!(info.scoped_values.is_empty());
}

#[tokio::test]
async fn app_url_gate_rejects_non_matching_instance() {
    let mut spec = bool_spec(false);
    spec.app_url = Some("^https://us\\.".to_string());
    let mut defs = BTreeMap::new();
    defs.insert("darkMode".to_string(), spec);

    let engine = Engine::new(EngineConfig {
        app_url: Some("https://eu.example.com".to_string()),
        runtime_definitions: defs,
        ..EngineConfig::default()
    });
    engine.initialize(Arc::new(MemoryStore::new())).await.unwrap();

    let errors = engine
        .change_value("darkMode", Some(FlagValue::Boolean(true)), None, None)
        .await
        .unwrap();
    assert_eq!(errors[0].error_message, messages::APP_URL_MISMATCH);
    assert_eq!(
        errors[0].error_message_values,
        vec![json!("https://eu.example.com"), json!("^https://us\\.")]
    );
}

#[tokio::test]
async fn app_url_gate_admits_matching_instance() {
    let mut spec = bool_spec(false);
    spec.app_url = Some("^https://us\\.".to_string());
    let mut defs = BTreeMap::new();
    defs.insert("darkMode".to_string(), spec);

    let engine = Engine::new(EngineConfig {
        app_url: Some("https://us.example.com".to_string()),
        runtime_definitions: defs,
        ..EngineConfig::default()
    });
    engine.initialize(Arc::new(MemoryStore::new())).await.unwrap();

    let errors = engine
        .change_value("darkMode", Some(FlagValue::Boolean(true)), None, None)
        .await
        .unwrap();
    assert!(errors.is_empty());
}

struct RejectingValidator;

#[async_trait]
impl FeatureValidator for RejectingValidator {
    async fn validate(
        &self,
        feature_key: String,
        _value: FlagValue,
        _scope_map: Option<ScopeMap>,
    ) -> Vec<ValidationError> {
        vec![ValidationError::new(feature_key, "value is on the blocklist")]
    }
}

struct PanickingValidator;

#[async_trait]
impl FeatureValidator for PanickingValidator {
    async fn validate(
        &self,
        _feature_key: String,
        _value: FlagValue,
        _scope_map: Option<ScopeMap>,
    ) -> Vec<ValidationError> {
        panic!("validator blew up");
    }
}

#[tokio::test]
async fn custom_validators_all_run_and_panics_are_isolated() {
    let mut spec = string_spec("ok");
    spec.validations = vec![
        ValidationRule::Validator {
            validator: "blocklist".to_string(),
        },
        ValidationRule::Validator {
            validator: "fragile".to_string(),
        },
    ];
    let mut defs = BTreeMap::new();
    defs.insert("greeting".to_string(), spec);

    let engine = Engine::new(EngineConfig {
        runtime_definitions: defs,
        ..EngineConfig::default()
    });
    engine
        .register_validator("blocklist", Arc::new(RejectingValidator))
        .await;
    engine
        .register_validator("fragile", Arc::new(PanickingValidator))
        .await;
    engine.initialize(Arc::new(MemoryStore::new())).await.unwrap();

    let errors = engine
        .change_value("greeting", Some(FlagValue::String("hi".to_string())), None, None)
        .await
        .unwrap();

    // Both validators report: the rejection and the isolated panic.
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].error_message, "value is on the blocklist");
    assert_eq!(errors[1].error_message, messages::VALIDATOR_FAILED);
    assert_eq!(errors[1].error_message_values[0], json!("fragile"));
}

#[tokio::test]
async fn unregistered_validator_reference_fails_initialization() {
    let mut spec = bool_spec(false);
    spec.validations = vec![ValidationRule::Validator {
        validator: "missing".to_string(),
    }];
    let mut defs = BTreeMap::new();
    defs.insert("darkMode".to_string(), spec);

    let engine = Engine::new(EngineConfig {
        runtime_definitions: defs,
        ..EngineConfig::default()
    });
    let err = engine
        .initialize(Arc::new(MemoryStore::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
}

#[tokio::test]
async fn invalid_regex_pattern_fails_initialization() {
    let mut spec = string_spec("x");
    spec.validations = vec![ValidationRule::Regex {
        regex: "([unclosed".to_string(),
    }];
    let mut defs = BTreeMap::new();
    defs.insert("broken".to_string(), spec);

    let engine = Engine::new(EngineConfig {
        runtime_definitions: defs,
        ..EngineConfig::default()
    });
    let err = engine
        .initialize(Arc::new(MemoryStore::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
}
