use anyhow::{Context as _, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::SystemTime;

/// The two filesystem calls a load needs.
#[async_trait]
pub trait Fs: Send + Sync {
    async fn modified(&self, path: &Path) -> Result<SystemTime>;
    async fn load(&self, path: &Path) -> Result<String>;
}

pub struct RealFs;

#[async_trait]
impl Fs for RealFs {
    async fn modified(&self, path: &Path) -> Result<SystemTime> {
        let metadata = smol::fs::metadata(path)
            .await
            .with_context(|| format!("failed to stat {}", path.display()))?;
        metadata
            .modified()
            .with_context(|| format!("no modification time for {}", path.display()))
    }

    async fn load(&self, path: &Path) -> Result<String> {
        smol::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeFs;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use anyhow::anyhow;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    /// In-memory files with a clock that ticks one second per write.
    #[derive(Default)]
    pub struct FakeFs {
        state: Mutex<FakeFsState>,
    }

    #[derive(Default)]
    struct FakeFsState {
        files: HashMap<PathBuf, FakeFile>,
        failing_reads: HashSet<PathBuf>,
        reads: usize,
        clock: u64,
    }

    struct FakeFile {
        content: String,
        modified: SystemTime,
    }

    impl FakeFsState {
        fn tick(&mut self) -> SystemTime {
            self.clock += 1;
            SystemTime::UNIX_EPOCH + Duration::from_secs(self.clock)
        }
    }

    impl FakeFs {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Creates or overwrites a file, advancing its mtime.
        pub fn insert_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
            let mut state = self.state.lock();
            let modified = state.tick();
            state.files.insert(
                path.as_ref().to_path_buf(),
                FakeFile {
                    content: content.into(),
                    modified,
                },
            );
        }

        /// Replaces the content without touching the mtime.
        pub fn write_file_preserving_mtime(
            &self,
            path: impl AsRef<Path>,
            content: impl Into<String>,
        ) {
            if let Some(file) = self.state.lock().files.get_mut(path.as_ref()) {
                file.content = content.into();
            }
        }

        pub fn set_modified(&self, path: impl AsRef<Path>, modified: SystemTime) {
            if let Some(file) = self.state.lock().files.get_mut(path.as_ref()) {
                file.modified = modified;
            }
        }

        pub fn mtime(&self, path: impl AsRef<Path>) -> Option<SystemTime> {
            let state = self.state.lock();
            state.files.get(path.as_ref()).map(|file| file.modified)
        }

        pub fn remove_file(&self, path: impl AsRef<Path>) {
            self.state.lock().files.remove(path.as_ref());
        }

        /// Makes reads of `path` fail while stats keep succeeding.
        pub fn fail_reads(&self, path: impl AsRef<Path>) {
            self.state
                .lock()
                .failing_reads
                .insert(path.as_ref().to_path_buf());
        }

        pub fn read_count(&self) -> usize {
            self.state.lock().reads
        }
    }

    #[async_trait]
    impl Fs for FakeFs {
        async fn modified(&self, path: &Path) -> Result<SystemTime> {
            self.state
                .lock()
                .files
                .get(path)
                .map(|file| file.modified)
                .ok_or_else(|| anyhow!("no such file: {}", path.display()))
        }

        async fn load(&self, path: &Path) -> Result<String> {
            let mut state = self.state.lock();
            state.reads += 1;
            if state.failing_reads.contains(path) {
                return Err(anyhow!("read failed: {}", path.display()));
            }
            state
                .files
                .get(path)
                .map(|file| file.content.clone())
                .ok_or_else(|| anyhow!("no such file: {}", path.display()))
        }
    }
}
