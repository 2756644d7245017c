use crate::cache::{
    BackendKind, Cache, CacheBackend, EdgeBackend, FilesystemBackend, MemoryBackend,
    PlatformCache,
};
use crate::config::{BackendChoice, CacheConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Capabilities available to the process, probed once at startup
#[derive(Clone, Default)]
pub struct CacheEnvironment {
    platform: Option<Arc<dyn PlatformCache>>,
    directory: Option<PathBuf>,
}

impl std::fmt::Debug for CacheEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEnvironment")
            .field("platform", &self.platform.is_some())
            .field("directory", &self.directory)
            .finish()
    }
}

impl CacheEnvironment {
    /// Checks whether the configured (or default) cache directory is usable
    ///
    /// A native process has no platform cache; sandboxed hosts attach theirs
    /// with [`CacheEnvironment::with_platform`].
    pub fn probe(config: &CacheConfig) -> Self {
        let directory = config
            .directory
            .clone()
            .or_else(default_cache_dir)
            .filter(|dir| is_writable(dir));
        Self {
            platform: None,
            directory,
        }
    }

    /// An environment with no persistent storage at all
    pub fn ephemeral() -> Self {
        Self::default()
    }

    pub fn with_platform(mut self, platform: Arc<dyn PlatformCache>) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn has_platform(&self) -> bool {
        self.platform.is_some()
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Backend that [`open_cache`] will build for `choice`
    pub fn select(&self, choice: BackendChoice) -> BackendKind {
        match choice {
            BackendChoice::Memory => BackendKind::Memory,
            BackendChoice::Filesystem if self.directory.is_some() => BackendKind::Filesystem,
            BackendChoice::Filesystem => BackendKind::Memory,
            BackendChoice::Auto if self.platform.is_some() => BackendKind::Edge,
            BackendChoice::Auto if self.directory.is_some() => BackendKind::Filesystem,
            BackendChoice::Auto => BackendKind::Memory,
        }
    }
}

/// Builds and initializes the process-wide cache
///
/// Falls back to the memory backend when the selected backend cannot be
/// initialized.
pub async fn open_cache(env: &CacheEnvironment, config: &CacheConfig) -> Cache {
    let kind = env.select(config.backend);
    if config.backend == BackendChoice::Filesystem && kind != BackendKind::Filesystem {
        warn!("Filesystem cache requested but no writable cache directory is available");
    }

    let backend: Arc<dyn CacheBackend> = match (kind, &env.platform, &env.directory) {
        (BackendKind::Edge, Some(platform), _) => {
            Arc::new(EdgeBackend::new(platform.clone(), config.namespace.clone()))
        }
        (BackendKind::Filesystem, _, Some(directory)) => Arc::new(FilesystemBackend::new(
            directory,
            &config.namespace,
            config.max_bytes,
        )),
        _ => Arc::new(MemoryBackend::new(config.memory_max_bytes)),
    };

    let cache = Cache::new(backend).with_default_ttl(config.default_ttl());
    match cache.init().await {
        Ok(()) => {
            info!("Using {} cache backend", cache.kind());
            cache
        }
        Err(e) => {
            warn!(
                "Failed to initialize {} cache backend, falling back to memory: {}",
                cache.kind(),
                e
            );
            Cache::new(Arc::new(MemoryBackend::new(config.memory_max_bytes)))
                .with_default_ttl(config.default_ttl())
        }
    }
}

/// `$XDG_CACHE_HOME/prompt-harvest`, else `$HOME/.cache/prompt-harvest`
pub fn default_cache_dir() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))?;
    Some(base.join("prompt-harvest"))
}

/// Runs once at startup, so plain blocking IO is fine here
fn is_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(format!(".probe-{}", std::process::id()));
    let writable = std::fs::write(&probe, b"ok").is_ok();
    let _ = std::fs::remove_file(&probe);
    writable
}
