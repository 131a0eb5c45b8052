//! Layered configuration for `pcat`.
//!
//! Values are merged from, in increasing order of precedence:
//!
//! 1. built-in defaults,
//! 2. a config file (TOML, or YAML/JSON by extension),
//! 3. `PCAT_`-prefixed environment variables, with `__` separating nested
//!    keys (`PCAT_STORE__ROOT=/mnt/drive`).
//!
//! ```toml
//! source = "Google Photos"
//! target = "Archive"
//! media = "images-and-videos"
//! date_fallback = "created"
//!
//! [store]
//! kind = "local"
//! root = "/mnt/drive"
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use pcat_catalogue::{Classifier, Context, DateFallback, MediaPolicy};
use pcat_store::backend::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "PCAT_";
const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Folder to catalogue media from (`root`, `id:<id>` or a top-level folder name).
    pub source: Option<String>,
    /// Folder that receives the `YYYY/MM/DD` hierarchy.
    pub target: Option<String>,
    pub media: MediaPolicy,
    pub date_fallback: DateFallback,
    /// Folders listed at the same time while building snapshot trees, and
    /// the limit on concurrent remote requests.
    pub concurrency: usize,
    /// Seconds before a single remote request is abandoned.
    pub request_timeout: u64,
    /// Additional attempts for failed reads.
    pub retries: u32,
    pub store: StoreConfig,
}
impl Default for Config {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            source: None,
            target: None,
            media: MediaPolicy::default(),
            date_fallback: DateFallback::default(),
            concurrency: 1,
            request_timeout: policy.timeout.as_secs(),
            retries: policy.retries,
            store: StoreConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StoreConfig {
    /// A directory tree standing in for the drive.
    Local {
        root: Option<PathBuf>,
        #[serde(default = "default_page_size")]
        page_size: usize,
    },
}
impl Default for StoreConfig {
    fn default() -> Self {
        Self::Local {
            root: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Config {
    /// Load configuration from defaults, a config file and the environment.
    ///
    /// When `path` is `None` the per-user config file is used if it exists.
    /// The result is not [validated](Self::validate), so callers can apply
    /// overrides first.
    ///
    /// # Errors
    /// - [`ErrorKind::NotFound`] if `path` was given but doesn't exist.
    /// - [`ErrorKind::Load`] if a provider fails or a value has the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::extract(path, Some(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load configuration from defaults and a single file, ignoring the environment.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::extract(Some(path), None)
    }

    fn extract(path: Option<&Path>, env: Option<Env>) -> Result<Self> {
        let file = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.display().to_string())),
            Some(path) => Some(path.to_path_buf()),
            None => default_path().filter(|p| p.is_file()),
        };
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = &file {
            tracing::debug!(path = %file.display(), "Loading config file");
            figment = match file.extension().and_then(|e| e.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(file)),
                Some("json") => figment.merge(Json::file_exact(file)),
                _ => figment.merge(Toml::file_exact(file)),
            };
        }
        if let Some(env) = env {
            figment = figment.merge(env);
        }
        figment.extract().or_raise(|| ErrorKind::Load)
    }

    /// Check values that deserialized fine but can't be used.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("concurrency must be at least 1".to_string()));
        }
        if self.request_timeout == 0 {
            exn::bail!(ErrorKind::Invalid("request_timeout must be at least 1 second".to_string()));
        }
        match &self.store {
            StoreConfig::Local { root: None, .. } => {
                exn::bail!(ErrorKind::Invalid("store.root is not set".to_string()));
            },
            StoreConfig::Local { page_size: 0, .. } => {
                exn::bail!(ErrorKind::Invalid("store.page_size must be at least 1".to_string()));
            },
            StoreConfig::Local { .. } => {},
        }
        for (key, value) in [("source", &self.source), ("target", &self.target)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                exn::bail!(ErrorKind::Invalid(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_secs(self.request_timeout),
            retries: self.retries,
            ..RetryPolicy::default()
        }
    }

    pub fn context(&self) -> Context {
        Context {
            classifier: Classifier::new(self.media, self.date_fallback),
            concurrency: self.concurrency,
        }
    }
}

/// `config.toml` in the platform's per-user config directory.
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "pcat").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
