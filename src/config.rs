//! Server configuration.
//!
//! Defaults suit a slow serial link; any of them can be changed from a
//! YAML file named by the `CONFIG` environment variable. `LISTEN` and
//! `DOC_ROOT` override the listen address and document root last.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::fs::resolver::ResolveOptions;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Pending connections the OS queues while one is being served.
    pub backlog: u32,
    /// Longest wait for the next read or write before giving up on a peer.
    pub idle_timeout_secs: u64,
    /// Upper bound on a request head, terminator included.
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            backlog: 8,
            idle_timeout_secs: 60,
            max_request_bytes: 4096,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticFilesConfig {
    pub root: PathBuf,
    pub index_file: String,
    pub directory_listing: bool,
    /// Bytes read from a file per socket write.
    pub chunk_size: usize,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("www"),
            index_file: "index.htm".to_string(),
            directory_listing: true,
            chunk_size: 512,
        }
    }
}

impl Config {
    /// Loads the configuration from the environment.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var_os("CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        // An empty document means "all defaults".
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Applies `LISTEN` and `DOC_ROOT` as returned by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("LISTEN") {
            self.server.listen_addr = addr;
        }
        if let Some(root) = lookup("DOC_ROOT") {
            self.static_files.root = PathBuf::from(root);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.listen_addr()?;

        if self.server.backlog == 0 {
            anyhow::bail!("server.backlog must be at least 1");
        }
        if self.server.idle_timeout_secs == 0 {
            anyhow::bail!("server.idle_timeout_secs must be at least 1");
        }
        if self.server.max_request_bytes < 16 {
            anyhow::bail!("server.max_request_bytes must be at least 16");
        }
        if self.static_files.chunk_size == 0 {
            anyhow::bail!("static_files.chunk_size must be at least 1");
        }

        let index = &self.static_files.index_file;
        if index.is_empty() || index.contains(['/', '\\']) || index == "." || index == ".." {
            anyhow::bail!("static_files.index_file must be a plain file name, got {index:?}");
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .listen_addr
            .parse()
            .with_context(|| format!("invalid listen address {:?}", self.server.listen_addr))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.server.idle_timeout_secs)
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            index_file: self.static_files.index_file.clone(),
            directory_listing: self.static_files.directory_listing,
        }
    }
}
