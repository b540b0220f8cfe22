//! Create-once ledger bootstrap
//!
//! A process runs one authoritative ledger. [`LedgerRegistry`] hands out that
//! ledger: the first `open` builds it, later calls get the same instance back
//! together with [`Opened::Existing`], so a caller asking for different
//! parameters can tell they were not applied.

use crate::{Config, Ledger, Result};
use std::sync::{Arc, OnceLock};

/// Outcome of [`LedgerRegistry::open`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opened {
    /// This call created the ledger
    Created,
    /// A ledger already existed; the requested parameters were ignored
    Existing,
}

/// Holder of the single ledger instance
#[derive(Debug, Default)]
pub struct LedgerRegistry {
    ledger: OnceLock<Arc<Ledger>>,
}

impl LedgerRegistry {
    /// Empty registry
    pub const fn new() -> Self {
        Self {
            ledger: OnceLock::new(),
        }
    }

    /// Open the ledger with default settings and the given identity
    pub fn open(
        &self,
        name: &str,
        description: &str,
        seed: &str,
    ) -> Result<(Arc<Ledger>, Opened)> {
        self.open_with(Config::new(name, description, seed))
    }

    /// Open the ledger from a full configuration
    pub fn open_with(&self, config: Config) -> Result<(Arc<Ledger>, Opened)> {
        if let Some(existing) = self.ledger.get() {
            return Ok((Self::reuse(existing, &config), Opened::Existing));
        }

        let ledger = Arc::new(Ledger::new(config.clone())?);

        // Another thread may have won the race between `get` and `set`
        match self.ledger.set(ledger.clone()) {
            Ok(()) => Ok((ledger, Opened::Created)),
            Err(_) => {
                let existing = self
                    .ledger
                    .get()
                    .ok_or_else(|| crate::Error::Concurrency("registry lost its ledger".into()))?;
                Ok((Self::reuse(existing, &config), Opened::Existing))
            }
        }
    }

    fn reuse(existing: &Arc<Ledger>, requested: &Config) -> Arc<Ledger> {
        if existing.name() != requested.name
            || existing.description() != requested.description
            || existing.seed() != requested.seed
        {
            tracing::warn!(
                existing = %existing.name(),
                requested = %requested.name,
                "Ledger already exists, ignoring new parameters"
            );
        }
        existing.clone()
    }

    /// The ledger, if one was opened
    pub fn get(&self) -> Option<Arc<Ledger>> {
        self.ledger.get().cloned()
    }
}

static GLOBAL: LedgerRegistry = LedgerRegistry::new();

/// Open the process-wide ledger
///
/// The first call creates it; later calls return the same instance and
/// report [`Opened::Existing`].
pub fn create_ledger(name: &str, description: &str, seed: &str) -> Result<(Arc<Ledger>, Opened)> {
    GLOBAL.open(name, description, seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_open_creates() {
        let registry = LedgerRegistry::new();
        assert!(registry.get().is_none());

        let (ledger, opened) = registry.open("test", "test ledger 2023", "chapman").unwrap();
        assert_eq!(opened, Opened::Created);
        assert_eq!(ledger.name(), "test");
        assert!(registry.get().is_some());
    }

    #[test]
    fn test_second_open_returns_same_instance() {
        let registry = LedgerRegistry::new();
        let (first, _) = registry.open("test", "test ledger 2023", "chapman").unwrap();
        let (second, opened) = registry.open("other", "other ledger", "other").unwrap();

        assert_eq!(opened, Opened::Existing);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.name(), "test");
        assert_eq!(second.description(), "test ledger 2023");
        assert_eq!(second.seed(), "chapman");
    }

    #[test]
    fn test_failed_open_leaves_registry_empty() {
        let registry = LedgerRegistry::new();
        let mut config = Config::default();
        config.hash_algorithm = "MD4".to_string();

        assert!(registry.open_with(config).is_err());
        assert!(registry.get().is_none());
    }

    #[test]
    fn test_global_create_ledger() {
        let (a, _) = create_ledger("global", "first", "s1").unwrap();
        let (b, opened) = create_ledger("ignored", "second", "s2").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(opened, Opened::Existing);
    }
}
