#![forbid(unsafe_code)]

//! Persisted enablement: which conversations have virtualisation turned on.
//!
//! The only persisted state is a set of conversation identifiers stored as
//! one array under [`ENABLED_KEY`]. Which turns are hidden is never stored;
//! it is re-derived from the live page.
//!
//! Reads degrade instead of failing: a backend error is logged and treated
//! as the empty set, so an unreachable store leaves virtualisation off rather
//! than breaking initialisation. Writes surface their error to the caller and
//! never overwrite the stored set after a failed read.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::{info, warn};

/// Storage key for the enabled-conversation set.
pub const ENABLED_KEY: &str = "virtualiser_enabled";

static CONVERSATION_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/c/([a-f0-9-]+)").unwrap_or_else(|e| panic!("invalid conversation pattern: {e}"))
});

/// Extract the conversation identifier from a location path
/// (`/c/<hex-and-dashes>`), if any.
#[must_use]
pub fn conversation_id(path: &str) -> Option<String> {
    CONVERSATION_PATH
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Storage backend error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backend could not be reached.
    Unavailable(String),
    /// The stored payload was not an array of strings.
    Malformed(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed stored value: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Durable key-value storage holding string arrays.
///
/// Futures are not `Send`: backends run on the single UI event loop.
#[allow(async_fn_in_trait)]
pub trait StorageBackend {
    /// Read the array stored under `key`; `Ok(None)` when the key is absent.
    async fn load(&self, key: &str) -> Result<Option<Vec<String>>, StorageError>;

    /// Replace the array stored under `key`.
    async fn store(&self, key: &str, values: &[String]) -> Result<(), StorageError>;
}

/// Enabled-conversation set over a [`StorageBackend`].
#[derive(Debug)]
pub struct EnablementStore<B> {
    backend: B,
}

impl<B: StorageBackend> EnablementStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn load_set(&self) -> Result<BTreeSet<String>, StorageError> {
        Ok(self
            .backend
            .load(ENABLED_KEY)
            .await?
            .unwrap_or_default()
            .into_iter()
            .collect())
    }

    /// Every enabled conversation. Empty when the backend fails.
    pub async fn enabled_conversations(&self) -> BTreeSet<String> {
        match self.load_set().await {
            Ok(set) => set,
            Err(err) => {
                warn!(
                    target: "virtualiser::storage",
                    error = %err,
                    "failed to load enabled conversations"
                );
                BTreeSet::new()
            }
        }
    }

    /// Whether `conversation` is enabled. `None` (no conversation in the
    /// current location) is never enabled.
    pub async fn is_enabled(&self, conversation: Option<&str>) -> bool {
        let Some(conversation) = conversation else {
            return false;
        };
        self.enabled_conversations().await.contains(conversation)
    }

    /// Enable `conversation`. Idempotent. Returns the number of enabled
    /// conversations after the write.
    pub async fn enable(&self, conversation: &str) -> Result<usize, StorageError> {
        self.update(conversation, true).await
    }

    /// Disable `conversation`. Idempotent. Returns the number of enabled
    /// conversations after the write.
    pub async fn disable(&self, conversation: &str) -> Result<usize, StorageError> {
        self.update(conversation, false).await
    }

    async fn update(&self, conversation: &str, enabled: bool) -> Result<usize, StorageError> {
        let mut set = self.load_set().await.inspect_err(|err| {
            warn!(
                target: "virtualiser::storage",
                conversation,
                error = %err,
                "refusing to write enablement after failed read"
            );
        })?;
        let changed = if enabled {
            set.insert(conversation.to_owned())
        } else {
            set.remove(conversation)
        };
        if changed {
            let values: Vec<String> = set.iter().cloned().collect();
            self.backend
                .store(ENABLED_KEY, &values)
                .await
                .inspect_err(|err| {
                    warn!(
                        target: "virtualiser::storage",
                        conversation,
                        error = %err,
                        "failed to save enabled conversations"
                    );
                })?;
        }
        info!(
            target: "virtualiser::storage",
            conversation,
            enabled,
            total_enabled = set.len(),
            "saved enablement"
        );
        Ok(set.len())
    }
}

/// In-memory backend with failure injection.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: RefCell<HashMap<String, Vec<String>>>,
    fail_reads: RefCell<bool>,
    fail_writes: RefCell<bool>,
    writes: RefCell<usize>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.borrow_mut() = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.borrow_mut() = fail;
    }

    /// Number of successful writes.
    #[must_use]
    pub fn writes(&self) -> usize {
        *self.writes.borrow()
    }

    /// Raw stored array under `key`.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Vec<String>> {
        self.values.borrow().get(key).cloned()
    }
}

impl StorageBackend for MemoryBackend {
    async fn load(&self, key: &str) -> Result<Option<Vec<String>>, StorageError> {
        if *self.fail_reads.borrow() {
            return Err(StorageError::Unavailable("injected read failure".into()));
        }
        Ok(self.values.borrow().get(key).cloned())
    }

    async fn store(&self, key: &str, values: &[String]) -> Result<(), StorageError> {
        if *self.fail_writes.borrow() {
            return Err(StorageError::Unavailable("injected write failure".into()));
        }
        self.values
            .borrow_mut()
            .insert(key.to_owned(), values.to_vec());
        *self.writes.borrow_mut() += 1;
        Ok(())
    }
}
