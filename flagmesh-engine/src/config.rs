//! Engine configuration and definition-tier merging.
//!
//! Feature definitions come from up to three tiers — auto-discovered,
//! file-based (one or many files) and runtime-supplied — merged into
//! one definition set at initialization. A key collision inside a
//! single tier is a fatal configuration error; across tiers the
//! collision policy decides (default: the later tier wins).

use crate::{EngineError, EngineResult};
use flagmesh_store::DEFAULT_CAS_ATTEMPTS;
use flagmesh_types::{
    CollisionPolicy, DefinitionSpec, FeatureDefinition, SourceTier,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Static engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// This instance's application URL, matched against app-URL gates.
    pub app_url: Option<String>,
    /// Store entry holding the per-key scoped-value hash.
    pub values_key: String,
    /// Pub/sub channel for change propagation.
    pub change_channel: String,
    /// Prefix of legacy flat-format scalar entries.
    pub legacy_key_prefix: String,
    /// Compare-and-swap attempts per mutation.
    pub cas_attempts: usize,
    /// Capacity of the superscope enumeration cache.
    pub superscope_cache_capacity: usize,
    /// Cross-tier definition collision policy.
    pub collision_policy: CollisionPolicy,
    /// Auto-discovered definitions (host framework tier).
    pub auto_definitions: BTreeMap<String, DefinitionSpec>,
    /// Definition files, loaded in order.
    pub definition_files: Vec<PathBuf>,
    /// Runtime-supplied definitions (embedding application tier).
    pub runtime_definitions: BTreeMap<String, DefinitionSpec>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_url: None,
            values_key: "flagmesh:values".to_string(),
            change_channel: "flagmesh:changes".to_string(),
            legacy_key_prefix: "flagmesh:".to_string(),
            cas_attempts: DEFAULT_CAS_ATTEMPTS,
            superscope_cache_capacity: flagmesh_scope::SUPERSCOPE_CACHE_CAPACITY,
            collision_policy: CollisionPolicy::default(),
            auto_definitions: BTreeMap::new(),
            definition_files: Vec::new(),
            runtime_definitions: BTreeMap::new(),
        }
    }
}

/// Merges the three configuration tiers into one definition set.
///
/// Returns the merged definitions plus per-tier counts for the
/// initialization log line.
pub(crate) fn merge_definitions(
    config: &EngineConfig,
) -> EngineResult<BTreeMap<String, FeatureDefinition>> {
    let mut merged: BTreeMap<String, FeatureDefinition> = BTreeMap::new();
    let mut counts: BTreeMap<SourceTier, usize> = BTreeMap::new();

    let mut absorb = |merged: &mut BTreeMap<String, FeatureDefinition>,
                      definition: FeatureDefinition|
     -> EngineResult<()> {
        *counts.entry(definition.tier).or_insert(0) += 1;
        match merged.get(&definition.key) {
            None => {
                merged.insert(definition.key.clone(), definition);
                Ok(())
            }
            Some(existing) if existing.tier == definition.tier => {
                Err(EngineError::Configuration(format!(
                    "duplicate definition for feature key {} in {} tier",
                    definition.key, definition.tier
                )))
            }
            Some(existing) => match config.collision_policy {
                CollisionPolicy::Override => {
                    info!(
                        key = definition.key,
                        winner = %definition.tier,
                        loser = %existing.tier,
                        "cross-tier definition collision, later tier wins"
                    );
                    merged.insert(definition.key.clone(), definition);
                    Ok(())
                }
                CollisionPolicy::Error => Err(EngineError::Configuration(format!(
                    "feature key {} defined in both {} and {} tiers",
                    definition.key, existing.tier, definition.tier
                ))),
            },
        }
    };

    for (key, spec) in &config.auto_definitions {
        absorb(
            &mut merged,
            FeatureDefinition::from_spec(key, spec.clone(), SourceTier::Auto),
        )?;
    }

    for path in &config.definition_files {
        for (key, spec) in load_definition_file(path)? {
            absorb(
                &mut merged,
                FeatureDefinition::from_spec(key, spec, SourceTier::File).with_source_file(path),
            )?;
        }
    }

    for (key, spec) in &config.runtime_definitions {
        absorb(
            &mut merged,
            FeatureDefinition::from_spec(key, spec.clone(), SourceTier::Runtime),
        )?;
    }

    for (tier, count) in &counts {
        info!(%tier, count, "merged feature definitions");
    }

    Ok(merged)
}

fn load_definition_file(path: &PathBuf) -> EngineResult<BTreeMap<String, DefinitionSpec>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        EngineError::Configuration(format!("cannot read definition file {}: {e}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        EngineError::Configuration(format!("cannot parse definition file {}: {e}", path.display()))
    })
}
