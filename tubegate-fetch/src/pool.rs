//! Credential pool and key rotation.
//!
//! The pool holds interchangeable API keys for one service. Each key owns a
//! ledger partition, so a key that burns through its daily budget stops being
//! selected while the others carry on. A quota error parks the key until the
//! quota day rolls over.
//!
//! Selection is first-fit in insertion order: the first active key whose
//! partition still has budget for the requested class wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use tubegate_core::{
    CallError, Clock, Credential, CredentialSource, ErrorKind, GovernorConfig, UsageStats,
    YOUTUBE_RESOURCE_CLASS, classify_error,
};
use tubegate_store::{LedgerConfig, UsageLedger, day_string, load_json_if_exists, save_json};

use crate::error::FetchError;

/// Shape of a YouTube Data API key.
static YOUTUBE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^AIza[A-Za-z0-9_-]{35}$").expect("Invalid regex"));

/// Returns true if `secret` looks like a YouTube Data API key.
pub fn is_valid_key_format(secret: &str) -> bool {
    YOUTUBE_KEY_RE.is_match(secret)
}

// ============================================================================
// Pool Config
// ============================================================================

/// Configuration for a [`CredentialPool`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Class checked by [`CredentialPool::get_available`] when none is given.
    pub resource_class: String,
    /// Template for every partition; its `path` is ignored.
    pub ledger: LedgerConfig,
    /// Where the credential list is persisted; `None` keeps it in memory.
    pub credentials_path: Option<PathBuf>,
    /// Directory for `usage-<key hash>.json` partitions; `None` keeps them in memory.
    pub partition_dir: Option<PathBuf>,
    /// Reject keys that do not match the YouTube key format.
    pub validate_format: bool,
}

impl PoolConfig {
    /// A memory-only pool over `ledger`.
    pub fn in_memory(ledger: LedgerConfig, resource_class: impl Into<String>) -> Self {
        Self {
            resource_class: resource_class.into(),
            ledger,
            credentials_path: None,
            partition_dir: None,
            validate_format: true,
        }
    }

    /// The YouTube Data API pool described by `config`.
    pub fn youtube(config: &GovernorConfig) -> Self {
        Self {
            resource_class: YOUTUBE_RESOURCE_CLASS.to_string(),
            ledger: LedgerConfig::for_youtube(config, None),
            credentials_path: Some(config.credentials_path()),
            partition_dir: Some(config.key_ledger_dir()),
            validate_format: true,
        }
    }

    /// Turns key format validation on or off.
    pub fn with_validation(mut self, validate_format: bool) -> Self {
        self.validate_format = validate_format;
        self
    }

    fn partition_path(&self, credential: &Credential) -> Option<PathBuf> {
        self.partition_dir
            .as_ref()
            .map(|dir| dir.join(format!("usage-{}.json", credential.key_hash())))
    }
}

// ============================================================================
// Public Types
// ============================================================================

/// A key to add to the pool.
#[derive(Debug, Clone)]
pub struct NewCredential {
    /// Display name; generated when `None`.
    pub name: Option<String>,
    /// The key material.
    pub secret: String,
    /// Where the key came from.
    pub source: CredentialSource,
}

impl NewCredential {
    /// A manually added key.
    pub fn manual(secret: impl Into<String>) -> Self {
        Self {
            name: None,
            secret: secret.into(),
            source: CredentialSource::Manual,
        }
    }

    /// Sets the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Result of [`CredentialPool::add`].
#[derive(Debug, Clone)]
pub struct AddOutcome {
    /// The stored credential (the existing one for duplicates).
    pub credential: Credential,
    /// True if the secret was already in the pool.
    pub duplicate: bool,
}

/// Counts over the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    /// All keys.
    pub total: usize,
    /// Keys not parked.
    pub active: usize,
    /// Keys parked after a quota error.
    pub inactive: usize,
    /// Active keys with no budget left today.
    pub exhausted: usize,
    /// Keys loaded from the credential file.
    pub from_file: usize,
    /// Keys imported from the environment.
    pub from_env: usize,
    /// Keys added at runtime.
    pub manual: usize,
}

/// Per-key usage, for dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialUsage {
    /// Credential id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Masked key.
    pub key: String,
    /// Short hash naming the partition file.
    pub key_hash: String,
    /// Where the key came from.
    pub source: CredentialSource,
    /// False while parked.
    pub active: bool,
    /// Day the key was parked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated_on: Option<String>,
    /// True if this key was handed out most recently.
    pub current: bool,
    /// Today's usage of the partition.
    pub usage: UsageStats,
}

// ============================================================================
// Credential Pool
// ============================================================================

struct PoolInner {
    credentials: Vec<Credential>,
    partitions: HashMap<String, Arc<UsageLedger>>,
    last_selected: Option<String>,
}

/// N interchangeable credentials with first-fit selection.
pub struct CredentialPool {
    config: PoolConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<PoolInner>,
}

impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("resource_class", &self.config.resource_class)
            .field("credentials_path", &self.config.credentials_path)
            .finish_non_exhaustive()
    }
}

impl CredentialPool {
    /// Opens a pool, loading credentials from `config.credentials_path`.
    ///
    /// A missing file yields an empty pool; an unreadable one is logged and
    /// also yields an empty pool.
    pub async fn open(config: PoolConfig, clock: Arc<dyn Clock>) -> Self {
        let credentials = match &config.credentials_path {
            Some(path) => match load_json_if_exists::<Vec<Credential>>(path).await {
                Ok(Some(credentials)) => credentials,
                Ok(None) => Vec::new(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unreadable credential file, starting empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        info!(count = credentials.len(), "Credential pool opened");
        Self::with_credentials(config, clock, credentials)
    }

    /// Creates a pool over a fixed list of credentials.
    pub fn with_credentials(
        config: PoolConfig,
        clock: Arc<dyn Clock>,
        credentials: Vec<Credential>,
    ) -> Self {
        Self {
            config,
            clock,
            inner: Mutex::new(PoolInner {
                credentials,
                partitions: HashMap::new(),
                last_selected: None,
            }),
        }
    }

    /// The pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// All credentials in insertion order.
    pub async fn credentials(&self) -> Vec<Credential> {
        self.inner.lock().await.credentials.clone()
    }

    /// Id of the credential handed out most recently.
    pub async fn last_selected(&self) -> Option<String> {
        self.inner.lock().await.last_selected.clone()
    }

    /// Current quota day.
    fn today(&self) -> String {
        day_string(self.clock.now(), &self.config.ledger.boundary)
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Returns the first usable credential for `class`.
    ///
    /// Keys parked on an earlier quota day are reactivated first. Fails with
    /// [`FetchError::NoCredentialAvailable`] when every key is parked or out
    /// of budget.
    #[instrument(skip(self))]
    pub async fn get_available(&self, class: Option<&str>) -> Result<Credential, FetchError> {
        let class = class.unwrap_or(self.config.resource_class.as_str());
        let mut inner = self.inner.lock().await;

        if self.reactivate_rolled_over(&mut inner) {
            self.save_credentials(&inner.credentials).await;
        }

        let candidates: Vec<Credential> =
            inner.credentials.iter().filter(|c| c.active).cloned().collect();
        for credential in candidates {
            let partition = self.partition(&mut inner, &credential).await;
            if partition.is_exceeded(class).await {
                debug!(credential = %credential.id, "Credential out of budget, skipping");
                continue;
            }
            debug!(credential = %credential.id, "Selected credential");
            inner.last_selected = Some(credential.id.clone());
            return Ok(credential);
        }

        warn!(class, total = inner.credentials.len(), "No credential available");
        Err(FetchError::NoCredentialAvailable {
            class: class.to_string(),
        })
    }

    /// Records the outcome of a call made with `credential`.
    ///
    /// Success charges the endpoint's cost to the credential's partition;
    /// failure counts one error. A quota failure also parks the credential
    /// until the quota day rolls over.
    #[instrument(skip(self, credential, error), fields(credential = %credential.id))]
    pub async fn record_outcome(
        &self,
        credential: &Credential,
        endpoint: &str,
        error: Option<&CallError>,
    ) {
        let mut inner = self.inner.lock().await;
        let Some(stored) = inner.credentials.iter().find(|c| c.id == credential.id).cloned() else {
            warn!("Outcome for unknown credential ignored");
            return;
        };

        let partition = self.partition(&mut inner, &stored).await;
        partition.track(endpoint, error.is_none()).await;

        let Some(error) = error else {
            return;
        };
        if classify_error(error) != ErrorKind::QuotaExceeded {
            return;
        }

        let today = self.today();
        if let Some(entry) = inner.credentials.iter_mut().find(|c| c.id == stored.id) {
            entry.active = false;
            entry.deactivated_on = Some(today.clone());
        }
        warn!(day = %today, error = %error, "Credential hit its quota, parked until rollover");
        if inner.last_selected.as_deref() == Some(stored.id.as_str()) {
            inner.last_selected = None;
        }
        self.save_credentials(&inner.credentials).await;
    }

    // ========================================================================
    // Management
    // ========================================================================

    /// Adds a key. Adding a secret that is already present returns the
    /// existing credential with `duplicate` set.
    #[instrument(skip(self, new), fields(source = %new.source))]
    pub async fn add(&self, new: NewCredential) -> Result<AddOutcome, FetchError> {
        let secret = new.secret.trim().to_string();
        if self.config.validate_format && !is_valid_key_format(&secret) {
            return Err(FetchError::InvalidCredential(
                "expected AIza followed by 35 characters".to_string(),
            ));
        }

        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.credentials.iter().find(|c| c.secret == secret) {
            debug!(credential = %existing.id, "Key already in pool");
            return Ok(AddOutcome {
                credential: existing.clone(),
                duplicate: true,
            });
        }

        let hash = tubegate_core::key_hash(&secret);
        let id = format!("key-{}", &hash[..8]);
        let name = new
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("API Key {}", inner.credentials.len() + 1));
        let credential = Credential::new(id, name, secret, new.source, self.clock.now());

        info!(credential = %credential.id, "Added credential");
        inner.credentials.push(credential.clone());
        self.save_credentials(&inner.credentials).await;

        Ok(AddOutcome {
            credential,
            duplicate: false,
        })
    }

    /// Removes a key by id.
    pub async fn remove(&self, id: &str) -> Result<Credential, FetchError> {
        let mut inner = self.inner.lock().await;
        let index = inner
            .credentials
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| FetchError::CredentialNotFound(id.to_string()))?;

        let removed = inner.credentials.remove(index);
        inner.partitions.remove(&removed.id);
        if inner.last_selected.as_deref() == Some(id) {
            inner.last_selected = None;
        }
        info!(credential = %removed.id, "Removed credential");
        self.save_credentials(&inner.credentials).await;
        Ok(removed)
    }

    /// Forgets cached partitions and the last selection.
    ///
    /// The next call re-reads partitions from disk and selects afresh. A
    /// memory-only pool has nothing to re-read, so its partitions stay and
    /// only the selection is forgotten.
    pub async fn clear_cache(&self) {
        let mut inner = self.inner.lock().await;
        if self.config.partition_dir.is_some() {
            inner.partitions.clear();
        }
        inner.last_selected = None;
        debug!(persistent = self.config.partition_dir.is_some(), "Cleared credential pool cache");
    }

    /// Imports keys from the process environment.
    ///
    /// See [`CredentialPool::load_from_vars`].
    pub async fn load_from_env(&self) -> usize {
        self.load_from_vars(std::env::vars()).await
    }

    /// Imports every variable whose name contains both `YOUTUBE` and `API`
    /// and whose value is a well-formed key. Returns how many keys were new.
    pub async fn load_from_vars<I>(&self, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut imported = 0;
        for (name, value) in vars {
            let upper = name.to_uppercase();
            if !(upper.contains("YOUTUBE") && upper.contains("API")) {
                continue;
            }
            if !is_valid_key_format(value.trim()) {
                debug!(var = %name, "Skipping variable without a valid key");
                continue;
            }
            let new = NewCredential {
                name: Some(name),
                secret: value,
                source: CredentialSource::Env,
            };
            match self.add(new).await {
                Ok(outcome) if !outcome.duplicate => imported += 1,
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Failed to import key from environment"),
            }
        }
        if imported > 0 {
            info!(imported, "Imported keys from environment");
        }
        imported
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    /// Counts over the pool.
    pub async fn stats(&self) -> PoolStats {
        let mut inner = self.inner.lock().await;
        self.reactivate_rolled_over(&mut inner);

        let mut stats = PoolStats {
            total: inner.credentials.len(),
            ..PoolStats::default()
        };
        let credentials = inner.credentials.clone();
        for credential in &credentials {
            match credential.source {
                CredentialSource::File => stats.from_file += 1,
                CredentialSource::Env => stats.from_env += 1,
                CredentialSource::Manual => stats.manual += 1,
            }
            if !credential.active {
                stats.inactive += 1;
                continue;
            }
            stats.active += 1;
            let partition = self.partition(&mut inner, credential).await;
            if partition.is_exceeded(&self.config.resource_class).await {
                stats.exhausted += 1;
            }
        }
        stats
    }

    /// Today's usage for every key.
    pub async fn usage_status(&self) -> Vec<CredentialUsage> {
        let mut inner = self.inner.lock().await;
        self.reactivate_rolled_over(&mut inner);

        let credentials = inner.credentials.clone();
        let mut status = Vec::with_capacity(credentials.len());
        for credential in credentials {
            let partition = self.partition(&mut inner, &credential).await;
            status.push(CredentialUsage {
                key: credential.masked(),
                key_hash: credential.key_hash(),
                current: inner.last_selected.as_deref() == Some(credential.id.as_str()),
                usage: partition.usage_stats().await,
                id: credential.id,
                name: credential.name,
                source: credential.source,
                active: credential.active,
                deactivated_on: credential.deactivated_on,
            });
        }
        status
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Reactivates keys parked on an earlier day. Returns true if any changed.
    fn reactivate_rolled_over(&self, inner: &mut PoolInner) -> bool {
        let today = self.today();
        let mut changed = false;
        for credential in inner.credentials.iter_mut().filter(|c| !c.active) {
            if credential.deactivated_on.as_deref() != Some(today.as_str()) {
                info!(credential = %credential.id, day = %today, "Reactivated credential after rollover");
                credential.active = true;
                credential.deactivated_on = None;
                changed = true;
            }
        }
        changed
    }

    async fn partition(&self, inner: &mut PoolInner, credential: &Credential) -> Arc<UsageLedger> {
        if let Some(ledger) = inner.partitions.get(&credential.id) {
            return Arc::clone(ledger);
        }

        let mut ledger_config = self.config.ledger.clone();
        ledger_config.path = self.config.partition_path(credential);
        let ledger = Arc::new(UsageLedger::open(ledger_config, Arc::clone(&self.clock)).await);
        inner
            .partitions
            .insert(credential.id.clone(), Arc::clone(&ledger));
        ledger
    }

    async fn save_credentials(&self, credentials: &[Credential]) {
        let Some(path) = &self.config.credentials_path else {
            return;
        };
        if let Err(e) = save_json(path, &credentials).await {
            error!(path = %path.display(), error = %e, "Failed to save credentials");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
