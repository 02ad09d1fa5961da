//! The engine — one explicit instance per process, no hidden statics.
//!
//! All state lives behind `Arc`s, so the engine is cheap to clone and
//! a clone is handed to the change-channel listener task. Resetting the
//! engine means dropping it and constructing a new one.
//!
//! Mutation goes through the shared store's compare-and-swap. A
//! committed write applies to local state before `change_value`
//! returns, so the writer reads its own write immediately; peers
//! converge through the published change batch. The writer's own echo
//! is suppressed by payload so handlers fire exactly once per change.
//! Degraded (store unreachable) operation applies changes in place the
//! same way, it just has nothing to publish.

use crate::config::{merge_definitions, EngineConfig};
use crate::registry::{
    ChangeHandler, FeatureChange, FeatureValidator, HandlerRegistry, ValidatorRegistry,
};
use crate::state::{apply_to_table, resolve, LocalState, ScopedValues};
use crate::validation::{validate, ChangeCheck, CompiledRules, ScopeInput};
use crate::{EngineError, EngineResult};
use flagmesh_scope::{ScopeKey, SuperscopeEnumerator};
use flagmesh_store::{cas_update, CasOutcome, SharedStore, StoreError};
use flagmesh_types::{
    ChangeEntry, ChangeOptions, FeatureDefinition, FlagType, FlagValue, ScopeMap, SourceTier,
    ValidationError,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as AsyncMutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const STATUS_NEW: u8 = 0;
const STATUS_INITIALIZING: u8 = 1;
const STATUS_READY: u8 = 2;

/// Local snapshot of one feature key's configuration and overrides.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureInfo {
    /// The feature key.
    pub feature_key: String,
    /// Configured value type.
    pub flag_type: FlagType,
    /// Configured fallback.
    pub fallback_value: FlagValue,
    /// Whether the key accepts writes.
    pub active: bool,
    /// Which tier supplied the definition.
    pub tier: SourceTier,
    /// Scoped overrides currently known locally.
    pub scoped_values: ScopedValues,
}

/// The distributed feature-toggle engine.
#[derive(Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    enumerator: Arc<SuperscopeEnumerator>,
    definitions: Arc<RwLock<BTreeMap<String, FeatureDefinition>>>,
    compiled: Arc<RwLock<CompiledRules>>,
    state: Arc<RwLock<LocalState>>,
    handlers: Arc<RwLock<HandlerRegistry>>,
    validators: Arc<RwLock<ValidatorRegistry>>,
    store: Arc<RwLock<Option<Arc<dyn SharedStore>>>>,
    status: Arc<AtomicU8>,
    degraded: Arc<AtomicBool>,
    // Serializes local callers targeting the same store field so they
    // do not pile redundant CAS contention onto each other.
    field_locks: Arc<AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
    // Payloads this instance published and already applied in place;
    // the listener drops the matching echo instead of re-applying it.
    pending_echoes: Arc<std::sync::Mutex<Vec<String>>>,
    listener: Arc<std::sync::Mutex<Option<JoinHandle<()>>>>,
}

impl Engine {
    /// Creates an uninitialized engine.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let enumerator = SuperscopeEnumerator::new(config.superscope_cache_capacity);
        Self {
            config: Arc::new(config),
            enumerator: Arc::new(enumerator),
            definitions: Arc::new(RwLock::new(BTreeMap::new())),
            compiled: Arc::new(RwLock::new(CompiledRules::default())),
            state: Arc::new(RwLock::new(LocalState::default())),
            handlers: Arc::new(RwLock::new(HandlerRegistry::default())),
            validators: Arc::new(RwLock::new(ValidatorRegistry::default())),
            store: Arc::new(RwLock::new(None)),
            status: Arc::new(AtomicU8::new(STATUS_NEW)),
            degraded: Arc::new(AtomicBool::new(false)),
            field_locks: Arc::new(AsyncMutex::new(HashMap::new())),
            pending_echoes: Arc::new(std::sync::Mutex::new(Vec::new())),
            listener: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    /// Whether initialization has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.status.load(Ordering::SeqCst) == STATUS_READY
    }

    /// Whether the engine runs in fallback-only degraded mode.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    // ── Registries ───────────────────────────────────────────────

    /// Registers a named validator. Definitions reference validators by
    /// name, so registration must happen before `initialize`.
    pub async fn register_validator(&self, name: &str, validator: Arc<dyn FeatureValidator>) {
        self.validators.write().await.register(name, validator);
    }

    /// Removes a named validator.
    pub async fn remove_validator(&self, name: &str) {
        self.validators.write().await.remove(name);
    }

    /// Registers a change handler for a key. The same handler may be
    /// registered repeatedly and fires once per registration.
    pub async fn register_change_handler(&self, key: &str, handler: Arc<dyn ChangeHandler>) {
        self.handlers.write().await.register(key, handler);
    }

    /// Removes every registration of a handler (by identity) for a key.
    pub async fn remove_change_handler(&self, key: &str, handler: &Arc<dyn ChangeHandler>) {
        self.handlers.write().await.remove(key, handler);
    }

    // ── Initialization ───────────────────────────────────────────

    /// Initializes the engine against a shared store.
    ///
    /// Merges the configuration tiers (fatal on bad or same-tier
    /// duplicate definitions), validates fallback values (warnings
    /// only), migrates legacy flat-format entries, loads and validates
    /// the distributed scoped-value tables, subscribes to the change
    /// channel and marks the engine initialized. Store connectivity
    /// failures degrade to fallback-only operation instead of failing
    /// startup. Calling this twice (or concurrently) is an error.
    pub async fn initialize(&self, store: Arc<dyn SharedStore>) -> EngineResult<()> {
        match self.status.compare_exchange(
            STATUS_NEW,
            STATUS_INITIALIZING,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {}
            Err(STATUS_INITIALIZING) => return Err(EngineError::AlreadyInitializing),
            Err(_) => return Err(EngineError::AlreadyInitialized),
        }

        match self.initialize_inner(store).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.status.store(STATUS_NEW, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn initialize_inner(&self, store: Arc<dyn SharedStore>) -> EngineResult<()> {
        let merged = merge_definitions(&self.config)?;
        let compiled = {
            let validators = self.validators.read().await;
            CompiledRules::compile(&merged, &validators)?
        };
        *self.definitions.write().await = merged;
        *self.compiled.write().await = compiled;
        *self.store.write().await = Some(store.clone());

        self.validate_fallback_values().await;

        let receiver = match self.connect_store(&store).await {
            Ok(receiver) => {
                self.degraded.store(false, Ordering::SeqCst);
                Some(receiver)
            }
            Err(e) => {
                warn!(error = %e, "shared store unreachable, degrading to fallback-only mode");
                self.degraded.store(true, Ordering::SeqCst);
                None
            }
        };

        self.status.store(STATUS_READY, Ordering::SeqCst);
        if let Some(receiver) = receiver {
            self.spawn_listener(receiver);
        }
        info!(
            keys = self.definitions.read().await.len(),
            degraded = self.is_degraded(),
            "feature-toggle engine initialized"
        );
        Ok(())
    }

    /// Best-effort fallback validation: collected and logged as
    /// warnings, never aborts startup.
    async fn validate_fallback_values(&self) {
        let definitions = self.definitions.read().await;
        let fallbacks: Vec<(String, FlagValue)> = definitions
            .iter()
            .map(|(key, def)| (key.clone(), def.fallback_value.clone()))
            .collect();
        drop(definitions);

        for (key, fallback) in fallbacks {
            let (_, errors) = self
                .run_validation(&key, Some(&fallback), None, false, false, true)
                .await;
            for error in errors {
                warn!(key, error = %error, "fallback value failed validation");
            }
        }
    }

    async fn connect_store(
        &self,
        store: &Arc<dyn SharedStore>,
    ) -> Result<mpsc::UnboundedReceiver<String>, StoreError> {
        self.migrate_legacy_entries(store).await?;
        self.load_remote_tables(store).await?;
        store.subscribe(&self.config.change_channel).await
    }

    /// Migrates legacy flat scalar entries (`<prefix><key>` holding one
    /// JSON scalar) into the ROOT slot of the per-key hash map, exactly
    /// once. Entries already consistent with the current fallback are
    /// skipped; the scalar is deleted either way.
    async fn migrate_legacy_entries(&self, store: &Arc<dyn SharedStore>) -> Result<(), StoreError> {
        let definitions = self.definitions.read().await;
        let keys: Vec<(String, FlagValue)> = definitions
            .iter()
            .map(|(key, def)| (key.clone(), def.fallback_value.clone()))
            .collect();
        drop(definitions);

        for (key, fallback) in keys {
            let legacy_key = format!("{}{}", self.config.legacy_key_prefix, key);
            if store.scalar_kind(&legacy_key).await? != flagmesh_store::ScalarKind::String {
                continue;
            }
            let Some(raw) = store.scalar_get(&legacy_key).await? else {
                continue;
            };
            match serde_json::from_str::<FlagValue>(&raw) {
                Ok(legacy_value) if legacy_value != fallback => {
                    let root = ScopeKey::root();
                    cas_update::<ScopedValues, _>(
                        store.as_ref(),
                        &self.config.values_key,
                        &key,
                        |old| {
                            let mut table = old.unwrap_or_default();
                            table
                                .entry(root.as_str().to_string())
                                .or_insert_with(|| legacy_value.clone());
                            Some(table)
                        },
                        self.config.cas_attempts,
                    )
                    .await?;
                    info!(key, "migrated legacy flat-format entry");
                }
                Ok(_) => {
                    debug!(key, "legacy entry equals current fallback, skipping");
                }
                Err(e) => {
                    warn!(key, error = %e, "discarding unparseable legacy entry");
                }
            }
            store.scalar_delete(&legacy_key).await?;
        }
        Ok(())
    }

    /// Reads and validates every active key's distributed table through
    /// the mutator's read path, discarding invalid entries with one
    /// summarized warning per key.
    async fn load_remote_tables(&self, store: &Arc<dyn SharedStore>) -> Result<(), StoreError> {
        let definitions = self.definitions.read().await;
        let keys: Vec<String> = definitions
            .iter()
            .filter(|(_, def)| def.active)
            .map(|(key, _)| key.clone())
            .collect();
        drop(definitions);

        for key in keys {
            let outcome = cas_update::<ScopedValues, _>(
                store.as_ref(),
                &self.config.values_key,
                &key,
                |old| old,
                self.config.cas_attempts,
            )
            .await?;
            let table = outcome.into_value();
            let validated = match table {
                Some(table) => Some(self.validated_table(&key, table).await),
                None => None,
            };
            self.state.write().await.replace_table(&key, validated);
        }
        Ok(())
    }

    async fn validated_table(&self, key: &str, table: ScopedValues) -> ScopedValues {
        let mut valid = ScopedValues::new();
        let mut discarded = 0usize;
        for (scope_key_str, value) in table {
            let scope_key = ScopeKey::from_encoded(&scope_key_str);
            let scope_map = match scope_key.decode() {
                Ok(map) => map,
                Err(_) => {
                    discarded += 1;
                    continue;
                }
            };
            let (_, errors) = self
                .run_validation(key, Some(&value), scope_map.as_ref(), true, false, true)
                .await;
            if errors.is_empty() {
                valid.insert(scope_key_str, value);
            } else {
                discarded += 1;
            }
        }
        if discarded > 0 {
            warn!(key, discarded, "discarded invalid remote scoped values");
        }
        valid
    }

    fn spawn_listener(&self, mut receiver: mpsc::UnboundedReceiver<String>) {
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            while let Some(payload) = receiver.recv().await {
                engine.handle_message(&payload).await;
            }
            debug!("change channel closed");
        });
        *self.listener.lock().unwrap() = Some(handle);
    }

    /// Stops the change-channel listener. The engine itself is reset by
    /// dropping it and constructing a new one.
    pub fn shutdown(&self) {
        if let Some(handle) = self.listener.lock().unwrap().take() {
            handle.abort();
        }
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Resolves the effective value of a key in an optional scope.
    pub async fn get_value(&self, key: &str, scope_map: Option<&ScopeMap>) -> Option<FlagValue> {
        let definitions = self.definitions.read().await;
        let state = self.state.read().await;
        resolve(
            definitions.get(key),
            state.table(key),
            &self.enumerator,
            scope_map,
        )
    }

    /// Local snapshot for one configured key.
    pub async fn get_info(&self, key: &str) -> Option<FeatureInfo> {
        let definitions = self.definitions.read().await;
        let def = definitions.get(key)?;
        let state = self.state.read().await;
        Some(FeatureInfo {
            feature_key: def.key.clone(),
            flag_type: def.flag_type,
            fallback_value: def.fallback_value.clone(),
            active: def.active,
            tier: def.tier,
            scoped_values: state.table(key).cloned().unwrap_or_default(),
        })
    }

    /// Local snapshot for every configured key.
    pub async fn get_all_infos(&self) -> Vec<FeatureInfo> {
        let definitions = self.definitions.read().await;
        let state = self.state.read().await;
        definitions
            .values()
            .map(|def| FeatureInfo {
                feature_key: def.key.clone(),
                flag_type: def.flag_type,
                fallback_value: def.fallback_value.clone(),
                active: def.active,
                tier: def.tier,
                scoped_values: state.table(&def.key).cloned().unwrap_or_default(),
            })
            .collect()
    }

    /// Fresh read-through of the whole shared value hash, including
    /// keys this instance does not configure locally. Falls back to the
    /// local snapshot with a warning when the store is unreachable.
    pub async fn get_remote_infos(&self) -> BTreeMap<String, ScopedValues> {
        let store = self.store.read().await.clone();
        if let Some(store) = store {
            match store.hash_get_all(&self.config.values_key).await {
                Ok(fields) => {
                    let mut infos = BTreeMap::new();
                    for (key, raw) in fields {
                        match serde_json::from_str::<ScopedValues>(&raw) {
                            Ok(table) => {
                                infos.insert(key, table);
                            }
                            Err(e) => warn!(key, error = %e, "skipping unparseable remote table"),
                        }
                    }
                    return infos;
                }
                Err(e) => warn!(error = %e, "remote read failed, serving local snapshot"),
            }
        }
        self.state.read().await.snapshot().into_iter().collect()
    }

    /// Re-reads and re-validates every active key's distributed table.
    ///
    /// In degraded mode this is a no-op: the local state holds writes
    /// that never reached the store, and a remote read must not clobber
    /// them. Leaving degraded mode means reconstructing the engine.
    pub async fn refresh(&self) -> EngineResult<()> {
        if !self.is_initialized() {
            return Err(EngineError::NotInitialized);
        }
        if self.is_degraded() {
            warn!("refresh skipped, engine is in degraded fallback-only mode");
            return Ok(());
        }
        let store = self.store.read().await.clone();
        let Some(store) = store else {
            return Ok(());
        };
        match self.load_remote_tables(&store).await {
            Ok(()) => Ok(()),
            Err(StoreError::Unavailable(reason)) => {
                warn!(reason, "refresh skipped, store unavailable");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    // ── Mutation ─────────────────────────────────────────────────

    /// Changes a feature value: validate, compare-and-swap against the
    /// shared store, and on a real write apply the change locally and
    /// publish one batch for peers. The write is visible to the caller
    /// as soon as this returns. With the store unreachable the change
    /// applies locally only.
    ///
    /// Returns the validation errors (empty = accepted). The only hard
    /// error a caller sees is CAS exhaustion on their own mutation.
    pub async fn change_value(
        &self,
        key: &str,
        new_value: Option<FlagValue>,
        scope_map: Option<&ScopeMap>,
        options: Option<ChangeOptions>,
    ) -> EngineResult<Vec<ValidationError>> {
        let opts = options.clone().unwrap_or_default();
        let (validated_scope, errors) = self
            .run_validation(key, new_value.as_ref(), scope_map, true, opts.remote_only, false)
            .await;
        if !errors.is_empty() {
            return Ok(errors);
        }

        let store = self.store.read().await.clone();
        let store = match store {
            Some(store) if !self.is_degraded() => store,
            _ => {
                self.apply_and_notify(key, validated_scope, new_value, options).await;
                return Ok(Vec::new());
            }
        };

        let scope_key = validated_scope
            .as_ref()
            .map(ScopeKey::encode)
            .unwrap_or_else(ScopeKey::root);

        let field_lock = self.field_lock(key).await;
        let _guard = field_lock.lock().await;

        let value_for_update = new_value.clone();
        let clear_sub_scopes = opts.clear_sub_scopes;
        let outcome = cas_update::<ScopedValues, _>(
            store.as_ref(),
            &self.config.values_key,
            key,
            move |old| {
                let mut table = old.unwrap_or_default();
                apply_to_table(
                    &mut table,
                    &scope_key,
                    value_for_update.as_ref(),
                    clear_sub_scopes,
                );
                if table.is_empty() {
                    None
                } else {
                    Some(table)
                }
            },
            self.config.cas_attempts,
        )
        .await;

        match outcome {
            Ok(CasOutcome::Unchanged(_)) => Ok(Vec::new()),
            Ok(CasOutcome::Written(_)) => {
                self.apply_and_publish(&store, key, validated_scope, new_value, options)
                    .await;
                Ok(Vec::new())
            }
            Err(StoreError::Unavailable(reason)) => {
                warn!(key, reason, "store unreachable, degrading and applying change locally");
                self.degraded.store(true, Ordering::SeqCst);
                self.apply_and_notify(key, validated_scope, new_value, options).await;
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes every override of a key (root tombstone clearing all
    /// subscopes), returning it to its fallback everywhere.
    pub async fn reset_value(&self, key: &str) -> EngineResult<Vec<ValidationError>> {
        self.change_value(
            key,
            None,
            None,
            Some(ChangeOptions {
                clear_sub_scopes: true,
                remote_only: false,
            }),
        )
        .await
    }

    /// Applies a committed write to local state, then publishes the
    /// change batch for peers. The matching echo on our own
    /// subscription is suppressed so handlers fire once.
    async fn apply_and_publish(
        &self,
        store: &Arc<dyn SharedStore>,
        key: &str,
        scope_map: Option<ScopeMap>,
        new_value: Option<FlagValue>,
        options: Option<ChangeOptions>,
    ) {
        let mut entry = ChangeEntry::new(key, new_value.clone());
        if let Some(map) = &scope_map {
            entry = entry.with_scope_map(map);
        }
        if let Some(opts) = options.clone().filter(|o| !o.is_default()) {
            entry = entry.with_options(opts);
        }
        let payload = match serde_json::to_string(&vec![entry]) {
            Ok(payload) => {
                self.pending_echoes.lock().unwrap().push(payload.clone());
                Some(payload)
            }
            Err(e) => {
                warn!(key, error = %e, "cannot serialize change batch, peers converge on refresh");
                None
            }
        };

        self.apply_and_notify(key, scope_map, new_value, options).await;

        if let Some(payload) = payload {
            if let Err(e) = store.publish(&self.config.change_channel, &payload).await {
                warn!(key, error = %e, "publish failed, peers converge on refresh");
                self.take_pending_echo(&payload);
            }
        }
    }

    /// Removes one pending self-published payload. Returns whether the
    /// payload was pending (and the echo should be dropped).
    fn take_pending_echo(&self, payload: &str) -> bool {
        let mut pending = self.pending_echoes.lock().unwrap();
        match pending.iter().position(|p| p == payload) {
            Some(pos) => {
                pending.remove(pos);
                true
            }
            None => false,
        }
    }

    // ── Inbound propagation ──────────────────────────────────────

    /// Processes one raw message from the change channel: a JSON array
    /// of change entries. A malformed envelope is logged and dropped
    /// entirely; a malformed individual entry is logged and skipped
    /// without affecting its siblings.
    pub async fn handle_message(&self, raw: &str) {
        // Our own publication, already applied before it was sent.
        if self.take_pending_echo(raw) {
            return;
        }
        let envelope: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "dropping undecodable change message");
                return;
            }
        };
        let Some(entries) = envelope.as_array() else {
            warn!("dropping change message that is not an entry sequence");
            return;
        };

        for raw_entry in entries {
            let entry: ChangeEntry = match serde_json::from_value(raw_entry.clone()) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping malformed change entry");
                    continue;
                }
            };
            self.apply_entry(entry).await;
        }
    }

    /// Re-validates and applies one inbound entry in place. No store
    /// write happens here — this instance is echoing a peer's already
    /// committed change.
    async fn apply_entry(&self, entry: ChangeEntry) {
        let opts = entry.options.clone().unwrap_or_default();
        let (scope_map, errors) = {
            let definitions = self.definitions.read().await;
            let compiled = self.compiled.read().await;
            let validators = self.validators.read().await;
            validate(
                self.is_initialized(),
                self.config.app_url.as_deref(),
                &definitions,
                &compiled,
                &validators,
                ChangeCheck {
                    feature_key: &entry.feature_key,
                    value: entry.new_value.as_ref(),
                    scope: entry.scope_map.as_ref().map(ScopeInput::Raw),
                    is_change: true,
                    remote_only: opts.remote_only,
                    during_init: false,
                },
            )
            .await
        };
        if !errors.is_empty() {
            for error in &errors {
                warn!(key = %entry.feature_key, error = %error, "rejecting inbound change entry");
            }
            return;
        }

        self.apply_and_notify(&entry.feature_key, scope_map, entry.new_value, entry.options)
            .await;
    }

    /// Applies a validated change to local state and notifies handlers
    /// with resolver-computed effective values.
    async fn apply_and_notify(
        &self,
        key: &str,
        scope_map: Option<ScopeMap>,
        new_value: Option<FlagValue>,
        options: Option<ChangeOptions>,
    ) {
        let scope_key = scope_map
            .as_ref()
            .map(ScopeKey::encode)
            .unwrap_or_else(ScopeKey::root);
        let clear_sub_scopes = options.as_ref().is_some_and(|o| o.clear_sub_scopes);

        let old_value = self.get_value(key, scope_map.as_ref()).await;
        self.state
            .write()
            .await
            .apply(key, &scope_key, new_value.as_ref(), clear_sub_scopes);
        let effective = self.get_value(key, scope_map.as_ref()).await;

        let change = FeatureChange {
            feature_key: key.to_string(),
            new_value: effective,
            old_value,
            scope_map,
            options,
        };
        self.fire_handlers(change).await;
    }

    /// Invokes every handler registered for the key, each isolated in
    /// its own task so one failing or panicking handler never affects
    /// its siblings.
    async fn fire_handlers(&self, change: FeatureChange) {
        let handlers = self.handlers.read().await.handlers_for(&change.feature_key);
        for handler in handlers {
            let change = change.clone();
            let key = change.feature_key.clone();
            match tokio::spawn(async move { handler.on_change(change).await }).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(key, error = %e, "change handler failed"),
                Err(e) => warn!(key, error = %e, "change handler panicked"),
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────

    async fn run_validation(
        &self,
        key: &str,
        value: Option<&FlagValue>,
        scope: Option<&ScopeMap>,
        is_change: bool,
        remote_only: bool,
        during_init: bool,
    ) -> (Option<ScopeMap>, Vec<ValidationError>) {
        let definitions = self.definitions.read().await;
        let compiled = self.compiled.read().await;
        let validators = self.validators.read().await;
        let scope_ref = scope.map(ScopeInput::Typed);
        validate(
            self.is_initialized(),
            self.config.app_url.as_deref(),
            &definitions,
            &compiled,
            &validators,
            ChangeCheck {
                feature_key: key,
                value,
                scope: scope_ref,
                is_change,
                remote_only,
                during_init,
            },
        )
        .await
    }

    async fn field_lock(&self, field: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.field_locks.lock().await;
        locks.entry(field.to_string()).or_default().clone()
    }
}
