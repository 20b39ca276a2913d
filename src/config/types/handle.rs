//! Reloadable presentation snapshot.
//!
//! Uses `arc-swap` for lock-free reads and atomic replacement, so request
//! handlers always see one complete configuration while the watcher swaps
//! in a new one.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;

use super::ConfigError;
use crate::config::{PresentationConfig, ServeOverrides};
use crate::utils::path::normalize_path;

/// Deck source plus the configuration it was loaded with.
#[derive(Debug, Clone)]
pub struct Presentation {
    pub config: PresentationConfig,
    /// Absolute path of the markdown deck.
    pub deck: PathBuf,
    /// Raw markdown, re-read on every reload.
    pub source: String,
}

impl Presentation {
    fn load(deck: &Path, explicit: Option<&Path>, overrides: &ServeOverrides) -> Result<Self> {
        let config = PresentationConfig::load(deck, explicit, overrides)?;
        let source =
            fs::read_to_string(deck).map_err(|err| ConfigError::Io(deck.to_path_buf(), err))?;
        Ok(Self {
            config,
            deck: deck.to_path_buf(),
            source,
        })
    }
}

/// Owner of the current [`Presentation`].
pub struct PresentationStore {
    deck: PathBuf,
    explicit_config: Option<PathBuf>,
    overrides: ServeOverrides,
    current: ArcSwap<Presentation>,
}

impl PresentationStore {
    pub fn open(
        deck: &Path,
        explicit_config: Option<&Path>,
        overrides: ServeOverrides,
    ) -> Result<Self> {
        let deck = normalize_path(deck);
        let presentation = Presentation::load(&deck, explicit_config, &overrides)?;
        Ok(Self {
            deck,
            explicit_config: explicit_config.map(Path::to_path_buf),
            overrides,
            current: ArcSwap::from_pointee(presentation),
        })
    }

    #[inline]
    pub fn current(&self) -> Arc<Presentation> {
        self.current.load_full()
    }

    pub fn deck_path(&self) -> &Path {
        &self.deck
    }

    /// Re-read deck and config from disk.
    ///
    /// On error the previous snapshot stays in place.
    pub fn reload(&self) -> Result<Arc<Presentation>> {
        let presentation =
            Presentation::load(&self.deck, self.explicit_config.as_deref(), &self.overrides)?;
        let presentation = Arc::new(presentation);
        self.current.store(Arc::clone(&presentation));
        Ok(presentation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE;

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let deck = dir.path().join("talk.md");
        fs::write(&deck, "# One\n---\n# Two\n").unwrap();
        (dir, deck)
    }

    #[test]
    fn test_open_reads_source() {
        let (_dir, deck) = fixture();
        let store = PresentationStore::open(&deck, None, ServeOverrides::default()).unwrap();

        let current = store.current();
        assert!(current.source.starts_with("# One"));
        assert_eq!(current.deck, normalize_path(&deck));
        assert_eq!(store.deck_path(), current.deck);
    }

    #[test]
    fn test_open_missing_deck_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = PresentationStore::open(
            &dir.path().join("missing.md"),
            None,
            ServeOverrides::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_reload_swaps_snapshot() {
        let (dir, deck) = fixture();
        let store = PresentationStore::open(&deck, None, ServeOverrides::default()).unwrap();
        let before = store.current();

        fs::write(&deck, "# Changed\n").unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[execute]\ntimeout = 7\n").unwrap();
        store.reload().unwrap();

        let after = store.current();
        assert_eq!(after.source, "# Changed\n");
        assert_eq!(after.config.execute.timeout, 7);
        // Readers holding the old snapshot keep a complete view
        assert!(before.source.starts_with("# One"));
        assert_eq!(before.config.execute.timeout, 30);
    }

    #[test]
    fn test_reload_failure_keeps_previous() {
        let (dir, deck) = fixture();
        let store = PresentationStore::open(&deck, None, ServeOverrides::default()).unwrap();

        fs::write(dir.path().join(CONFIG_FILE), "[execute\n").unwrap();
        assert!(store.reload().is_err());
        assert!(store.current().source.starts_with("# One"));
    }

    #[test]
    fn test_overrides_survive_reload() {
        let (dir, deck) = fixture();
        let overrides = ServeOverrides {
            port: Some(4000),
            ..Default::default()
        };
        let store = PresentationStore::open(&deck, None, overrides).unwrap();

        fs::write(dir.path().join(CONFIG_FILE), "[serve]\nport = 8000\n").unwrap();
        store.reload().unwrap();
        assert_eq!(store.current().config.serve.port, 4000);
    }
}
