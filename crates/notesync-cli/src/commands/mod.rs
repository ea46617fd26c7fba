//! CLI subcommands and the state they share
//!
//! Every command receives a [`Context`] carrying the global flags. Commands
//! that touch targets open a [`Workspace`]: configuration, local store and
//! catalog loaded together from the configured base directory.

pub mod add;
pub mod completions;
pub mod config;
pub mod edit;
pub mod fetch;
pub mod group;
pub mod list;
pub mod remove;
pub mod show;
pub mod sync;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use notesync_core::catalog::TargetCatalog;
use notesync_core::config::Config;
use notesync_core::domain::{SyncTarget, TargetId};
use notesync_fetch::PublicLinkSource;
use notesync_sync::{LocalStore, SyncOrchestrator};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::output::{OutputFormat, OutputFormatter};

/// Global options shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    config_path: PathBuf,
    format: OutputFormat,
}

impl Context {
    /// # Arguments
    /// * `config_path` - `--config` override; the default location otherwise
    /// * `format` - Output format chosen with `--json`
    pub fn new(config_path: Option<PathBuf>, format: OutputFormat) -> Self {
        Self {
            config_path: config_path.unwrap_or_else(Config::default_path),
            format,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_json(&self) -> bool {
        self.format.is_json()
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        self.format.formatter()
    }

    /// Loads the configuration, falling back to defaults
    pub fn load_config(&self) -> Config {
        Config::load_or_default(&self.config_path)
    }

    /// Opens the store and catalog named by the configuration
    pub fn workspace(&self) -> Result<Workspace> {
        let config = self.load_config();
        let store = LocalStore::from_config(&config.storage);
        let catalog = TargetCatalog::load(&store.catalog_path())?;
        debug!(
            base_dir = %store.base_dir().display(),
            targets = catalog.len(),
            "Opened workspace"
        );
        Ok(Workspace {
            config,
            store,
            catalog,
        })
    }
}

/// Configuration, local store and catalog of one invocation
#[derive(Debug)]
pub struct Workspace {
    pub config: Config,
    pub store: LocalStore,
    pub catalog: TargetCatalog,
}

impl Workspace {
    /// Writes the catalog back to the store
    pub fn save_catalog(&self) -> Result<()> {
        self.catalog.save(&self.store.catalog_path())
    }

    /// Resolves a full id or unique id prefix
    pub fn resolve(&self, id_or_prefix: &str) -> Result<TargetId> {
        Ok(self.catalog.find_by_prefix(id_or_prefix)?.id)
    }

    /// Looks up a target by id or prefix
    pub fn target(&self, id_or_prefix: &str) -> Result<&SyncTarget> {
        Ok(self.catalog.find_by_prefix(id_or_prefix)?)
    }

    /// Resolves an optional `--parent` argument
    pub fn resolve_parent(&self, parent: Option<&str>) -> Result<Option<TargetId>> {
        parent.map(|p| self.resolve(p)).transpose()
    }

    /// Builds an orchestrator over the production fetchers
    pub fn orchestrator(&self) -> Result<SyncOrchestrator> {
        let source = PublicLinkSource::new(&self.config.network)
            .context("Failed to create HTTP client")?;
        Ok(SyncOrchestrator::new(Arc::new(source), self.store.clone()))
    }
}

/// Token cancelled when the user presses Ctrl-C
pub fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let guard = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            guard.cancel();
        }
    });
    token
}

/// Serializes a target for `--json` output
pub fn target_json(target: &SyncTarget) -> Result<serde_json::Value> {
    serde_json::to_value(target).context("Failed to serialize target")
}

/// "1 file" / "2 files"
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    /// Context whose config points the store into a temp directory
    pub fn temp_context() -> (Context, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = notesync_core::config::ConfigBuilder::new()
            .base_dir(dir.path().join("store"))
            .build();
        let config_path = dir.path().join("config.yaml");
        config.save(&config_path).unwrap();
        (Context::new(Some(config_path), OutputFormat::Json), dir)
    }
}
