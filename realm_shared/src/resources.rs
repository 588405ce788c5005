//! Resource management.
//!
//! Maps logical visual-asset keys (e.g. `"Monsters/Orc"`) to loadable asset
//! handles. Successful loads are memoized per key. Failed loads are not: the
//! next request for the same key goes back to the loader.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use tracing::{debug, warn};

use crate::error::SyncError;

/// Handle to a loaded visual asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetHandle {
    pub id: u64,
    pub key: String,
}

/// Something that can turn an asset key into a handle.
pub trait AssetLoader: Send {
    fn load(&mut self, key: &str) -> anyhow::Result<AssetHandle>;
}

/// Loads assets from a directory on disk. The key is a path relative to the
/// root; the file must exist.
pub struct FsAssetLoader {
    root: PathBuf,
    next_id: u64,
}

impl FsAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            next_id: 1,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetLoader for FsAssetLoader {
    fn load(&mut self, key: &str) -> anyhow::Result<AssetHandle> {
        let path = self.root.join(key);
        let meta = std::fs::metadata(&path)
            .with_context(|| format!("stat asset {}", path.display()))?;
        anyhow::ensure!(meta.is_file(), "asset {} is not a file", path.display());

        let id = self.next_id;
        self.next_id += 1;
        Ok(AssetHandle {
            id,
            key: key.to_string(),
        })
    }
}

/// Memoizing key → handle resolver with a fallback handle.
pub struct ResourceResolver {
    loader: Box<dyn AssetLoader>,
    cache: HashMap<String, AssetHandle>,
    fallback: Option<AssetHandle>,
}

impl ResourceResolver {
    pub fn new(loader: Box<dyn AssetLoader>, fallback: Option<AssetHandle>) -> Self {
        Self {
            loader,
            cache: HashMap::new(),
            fallback,
        }
    }

    /// Builds a resolver whose fallback is itself loaded by key. A fallback
    /// key that fails to load leaves the resolver without a default.
    pub fn with_default_key(mut loader: Box<dyn AssetLoader>, default_key: Option<&str>) -> Self {
        let fallback = default_key
            .filter(|k| !k.is_empty())
            .and_then(|key| match loader.load(key) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!(key, error = %e, "Default asset failed to load");
                    None
                }
            });
        Self::new(loader, fallback)
    }

    /// Resolves a key to a handle.
    ///
    /// Empty or absent keys go straight to the fallback.
    pub fn resolve(&mut self, key: Option<&str>) -> Result<AssetHandle, SyncError> {
        let key = match key.map(str::trim) {
            Some(k) if !k.is_empty() => k,
            _ => return self.fallback_for(""),
        };

        if let Some(handle) = self.cache.get(key) {
            return Ok(handle.clone());
        }

        match self.loader.load(key) {
            Ok(handle) => {
                debug!(key, id = handle.id, "Asset resolved");
                self.cache.insert(key.to_string(), handle.clone());
                Ok(handle)
            }
            Err(e) => {
                debug!(key, error = %e, "Asset load failed, using fallback");
                self.fallback_for(key)
            }
        }
    }

    fn fallback_for(&self, key: &str) -> Result<AssetHandle, SyncError> {
        match &self.fallback {
            Some(handle) => Ok(handle.clone()),
            None => {
                warn!(key, "No asset and no fallback configured");
                Err(SyncError::ResourceUnavailable {
                    key: key.to_string(),
                })
            }
        }
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn default_handle(&self) -> Option<&AssetHandle> {
        self.fallback.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    /// Loader that fails its first `fail_first` calls, then succeeds.
    struct FlakyLoader {
        calls: Arc<AtomicUsize>,
        fail_first: usize,
    }

    impl AssetLoader for FlakyLoader {
        fn load(&mut self, key: &str) -> anyhow::Result<AssetHandle> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::ensure!(n >= self.fail_first, "not yet");
            Ok(AssetHandle {
                id: n as u64 + 100,
                key: key.to_string(),
            })
        }
    }

    fn fallback() -> AssetHandle {
        AssetHandle {
            id: 0,
            key: "Monsters/Default".into(),
        }
    }

    fn resolver(
        fail_first: usize,
        fallback: Option<AssetHandle>,
    ) -> (ResourceResolver, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let loader = FlakyLoader {
            calls: calls.clone(),
            fail_first,
        };
        (ResourceResolver::new(Box::new(loader), fallback), calls)
    }

    #[test]
    fn success_is_memoized() {
        let (mut r, calls) = resolver(0, None);
        let a = r.resolve(Some("orc")).unwrap();
        let b = r.resolve(Some("orc")).unwrap();
        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(r.is_cached("orc"));
    }

    #[test]
    fn failure_is_not_cached() {
        let (mut r, calls) = resolver(1, Some(fallback()));
        let first = r.resolve(Some("orc")).unwrap();
        assert_eq!(first, fallback());
        assert!(!r.is_cached("orc"));

        let second = r.resolve(Some("orc")).unwrap();
        assert_eq!(second.key, "orc");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_key_skips_loader() {
        let (mut r, calls) = resolver(0, Some(fallback()));
        assert_eq!(r.resolve(None).unwrap(), fallback());
        assert_eq!(r.resolve(Some("  ")).unwrap(), fallback());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(r.cached_len(), 0);
    }

    #[test]
    fn no_fallback_reports_unavailable() {
        let (mut r, _) = resolver(usize::MAX, None);
        let err = r.resolve(Some("dragon")).unwrap_err();
        assert!(matches!(err, SyncError::ResourceUnavailable { ref key } if key == "dragon"));
    }

    #[test]
    fn fs_loader_requires_existing_file() {
        let dir = std::env::temp_dir().join(format!("realm-assets-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("Monsters")).unwrap();
        std::fs::write(dir.join("Monsters/orc.glb"), b"glb").unwrap();

        let mut loader = FsAssetLoader::new(&dir);
        let h = loader.load("Monsters/orc.glb").unwrap();
        assert_eq!(h.key, "Monsters/orc.glb");
        assert!(loader.load("Monsters/missing.glb").is_err());
        assert!(loader.load("Monsters").is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
