use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use hbs_compiler::quoted_string;

/// Runs a throwaway bundle of `entry_source` rooted at `resolve_dir` and
/// reports the first file the bundler loaded, if any.
#[async_trait]
pub trait ModuleProbe: Send + Sync {
    async fn probe(&self, entry_source: &str, resolve_dir: &Path) -> Result<Option<PathBuf>>;
}

/// The synthetic entry that makes a bundler resolve `name`.
pub fn probe_entry(name: &str) -> String {
    format!("import {}", quoted_string(name))
}

/// Finds the file `name` resolves to from the first directory that can load it.
pub async fn resolve_in_dirs(
    name: &str,
    dirs: &[PathBuf],
    probe: &dyn ModuleProbe,
) -> Option<PathBuf> {
    let entry = probe_entry(name);
    for dir in dirs {
        match probe.probe(&entry, dir).await {
            Ok(Some(path)) => return Some(path),
            Ok(None) => {}
            Err(error) => log::debug!("resolving {name} from {}: {error:#}", dir.display()),
        }
    }
    None
}
