//! Effective-value resolution: scoped override, superscope fallthrough,
//! root override, fallback.

use flagmesh_engine::{Engine, EngineConfig};
use flagmesh_store::MemoryStore;
use flagmesh_types::{DefinitionSpec, FlagType, FlagValue, ScopeMap};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;

fn string_spec(fallback: &str) -> DefinitionSpec {
    DefinitionSpec {
        flag_type: FlagType::String,
        fallback_value: FlagValue::String(fallback.to_string()),
        active: true,
        app_url: None,
        validations: Vec::new(),
    }
}

fn scope(pairs: &[(&str, &str)]) -> ScopeMap {
    pairs.iter().map(|(d, v)| (d.to_string(), v.to_string())).collect()
}

fn s(v: &str) -> FlagValue {
    FlagValue::String(v.to_string())
}

/// Engine over a store whose `theme` key already holds scoped values.
async fn engine_with_table(table: serde_json::Value) -> Engine {
    let store = Arc::new(MemoryStore::new());
    store.seed_hash("flagmesh:values", "theme", &table.to_string());
    let mut defs = BTreeMap::new();
    defs.insert("theme".to_string(), string_spec("default"));
    let engine = Engine::new(EngineConfig {
        runtime_definitions: defs,
        ..EngineConfig::default()
    });
    engine.initialize(store).await.unwrap();
    engine
}

#[tokio::test]
async fn fallback_without_any_override() {
    let engine = engine_with_table(serde_json::json!({})).await;
    assert_eq!(engine.get_value("theme", None).await, Some(s("default")));
    assert_eq!(
        engine.get_value("theme", Some(&scope(&[("tenant", "acme")]))).await,
        Some(s("default"))
    );
}

#[tokio::test]
async fn root_override_beats_fallback() {
    let engine = engine_with_table(serde_json::json!({"//": "dark"})).await;
    assert_eq!(engine.get_value("theme", None).await, Some(s("dark")));
    // A scoped query without a scoped override lands on root too.
    assert_eq!(
        engine.get_value("theme", Some(&scope(&[("user", "u1")]))).await,
        Some(s("dark"))
    );
}

#[tokio::test]
async fn exact_scope_beats_root_and_fallback() {
    let engine = engine_with_table(serde_json::json!({
        "//": "dark",
        "tenant::acme": "sepia",
    }))
    .await;
    assert_eq!(
        engine.get_value("theme", Some(&scope(&[("tenant", "acme")]))).await,
        Some(s("sepia"))
    );
    assert_eq!(engine.get_value("theme", None).await, Some(s("dark")));
    assert_eq!(
        engine.get_value("theme", Some(&scope(&[("tenant", "globex")]))).await,
        Some(s("dark"))
    );
}

#[tokio::test]
async fn full_scope_key_preferred_over_any_subset() {
    let engine = engine_with_table(serde_json::json!({
        "tenant::acme": "sepia",
        "user::u1": "mono",
        "tenant::acme##user::u1": "contrast",
    }))
    .await;
    assert_eq!(
        engine
            .get_value("theme", Some(&scope(&[("tenant", "acme"), ("user", "u1")])))
            .await,
        Some(s("contrast"))
    );
}

#[tokio::test]
async fn subset_preference_follows_sorted_dimension_index_order() {
    // No full-key entry: the subset containing the first sorted
    // dimension (tenant) wins over the one containing the second
    // (user), independent of insertion order.
    let engine = engine_with_table(serde_json::json!({
        "user::u1": "mono",
        "tenant::acme": "sepia",
    }))
    .await;
    assert_eq!(
        engine
            .get_value("theme", Some(&scope(&[("user", "u1"), ("tenant", "acme")])))
            .await,
        Some(s("sepia"))
    );
}

#[tokio::test]
async fn larger_subsets_preferred_over_smaller_ones() {
    let engine = engine_with_table(serde_json::json!({
        "tenant::acme": "sepia",
        "region::eu##user::u1": "contrast",
    }))
    .await;
    // Query over three dimensions: the two-dimension subset wins over
    // the single-dimension one.
    assert_eq!(
        engine
            .get_value(
                "theme",
                Some(&scope(&[("region", "eu"), ("tenant", "acme"), ("user", "u1")]))
            )
            .await,
        Some(s("contrast"))
    );
}

#[tokio::test]
async fn inactive_key_is_frozen_to_fallback() {
    let store = Arc::new(MemoryStore::new());
    store.seed_hash(
        "flagmesh:values",
        "theme",
        &serde_json::json!({"//": "dark"}).to_string(),
    );
    let mut spec = string_spec("default");
    spec.active = false;
    let mut defs = BTreeMap::new();
    defs.insert("theme".to_string(), spec);
    let engine = Engine::new(EngineConfig {
        runtime_definitions: defs,
        ..EngineConfig::default()
    });
    engine.initialize(store).await.unwrap();

    assert_eq!(engine.get_value("theme", None).await, Some(s("default")));
    assert_eq!(
        engine.get_value("theme", Some(&scope(&[("tenant", "acme")]))).await,
        Some(s("default"))
    );
}

#[tokio::test]
async fn unconfigured_key_resolves_to_nothing() {
    let engine = engine_with_table(serde_json::json!({})).await;
    assert_eq!(engine.get_value("unknown", None).await, None);
}

#[tokio::test]
async fn oversized_scope_map_falls_back_to_root() {
    let engine = engine_with_table(serde_json::json!({
        "//": "dark",
        "tenant::acme": "sepia",
    }))
    .await;
    // Five dimensions exceed the enumeration bound: no superscope
    // lookup happens, only the root override applies.
    let wide = scope(&[
        ("a", "1"),
        ("b", "2"),
        ("c", "3"),
        ("d", "4"),
        ("tenant", "acme"),
    ]);
    assert_eq!(engine.get_value("theme", Some(&wide)).await, Some(s("dark")));
}
