use anyhow::Result;
use futures::FutureExt as _;
use futures::future::BoxFuture;
use hbs_compiler::PrecompileOptions;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::cache::{CacheStats, CompileCache};
use crate::fs::{Fs, RealFs};
use crate::module::{CompiledModule, Message};
use crate::options::PluginOptions;
use crate::pipeline::compile_template;
use crate::registry::HelperRegistry;

pub type OnLoadCallback =
    Arc<dyn Fn(OnLoadArgs) -> BoxFuture<'static, CompiledModule> + Send + Sync>;

/// Which load requests a callback wants.
#[derive(Debug, Clone)]
pub struct OnLoadOptions {
    pub filter: Regex,
    /// `None` matches every namespace.
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnLoadArgs {
    pub path: PathBuf,
    pub namespace: String,
}

/// The registration surface a bundler hands to [`Plugin::setup`].
pub trait PluginBuild {
    fn on_load(&mut self, options: OnLoadOptions, callback: OnLoadCallback);
}

pub trait Plugin {
    fn name(&self) -> &str;
    /// Called once per build. State created here lives as long as that build.
    fn setup(&self, build: &mut dyn PluginBuild);
}

pub struct HandlebarsPlugin {
    options: PluginOptions,
    filter: Regex,
    fs: Arc<dyn Fs>,
}

impl HandlebarsPlugin {
    pub fn new(options: PluginOptions) -> Result<Self> {
        Self::with_fs(options, Arc::new(RealFs))
    }

    pub fn with_fs(options: PluginOptions, fs: Arc<dyn Fs>) -> Result<Self> {
        let filter = options.filter_regex()?;
        Ok(Self {
            options,
            filter,
            fs,
        })
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }
}

impl Plugin for HandlebarsPlugin {
    fn name(&self) -> &str {
        "handlebars"
    }

    fn setup(&self, build: &mut dyn PluginBuild) {
        let loader = Arc::new(HandlebarsLoader::new(
            self.fs.clone(),
            self.options.additional_helpers.clone(),
            self.options.precompile_options.clone(),
        ));
        build.on_load(
            OnLoadOptions {
                filter: self.filter.clone(),
                namespace: None,
            },
            Arc::new(move |args: OnLoadArgs| {
                let loader = loader.clone();
                async move { loader.handle_load(&args.path).await }.boxed()
            }),
        );
    }
}

/// Serves load requests for template files, compiling each file at most once
/// per modification.
pub struct HandlebarsLoader {
    fs: Arc<dyn Fs>,
    cache: CompileCache,
    registry: HelperRegistry,
    options: PrecompileOptions,
}

impl HandlebarsLoader {
    pub fn new(fs: Arc<dyn Fs>, registry: HelperRegistry, options: PrecompileOptions) -> Self {
        Self {
            fs,
            cache: CompileCache::new(),
            registry,
            options,
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &CompileCache {
        &self.cache
    }

    pub async fn handle_load(&self, path: &Path) -> CompiledModule {
        let modified = match self.cache.lookup(path) {
            Some(entry) => {
                let current = self.modified(path).await;
                if let Some(current) = current
                    && entry.is_valid(current)
                {
                    log::debug!("using cached {}", path.display());
                    self.cache.note_hit();
                    return entry.module;
                }
                log::debug!("{} changed since it was compiled", path.display());
                self.cache.invalidate(path);
                current
            }
            None => {
                self.cache.note_miss();
                self.modified(path).await
            }
        };

        let source = match self.fs.load(path).await {
            Ok(source) => source,
            Err(error) => {
                log::warn!("{error:#}");
                return CompiledModule::error(Message::new(format!("{error:#}")));
            }
        };

        let module = compile_template(&source, &self.registry, &self.options);
        let module = module.attribute_to(path);
        match (&module, modified) {
            (CompiledModule::Source(_), Some(modified)) => {
                self.cache.store(path, module.clone(), modified);
            }
            (CompiledModule::Source(_), None) => {}
            (CompiledModule::Errors(errors), _) => {
                for error in errors {
                    log::warn!("failed to compile {}: {}", path.display(), error.text);
                }
            }
        }
        module
    }

    async fn modified(&self, path: &Path) -> Option<SystemTime> {
        self.fs
            .modified(path)
            .await
            .inspect_err(|error| log::debug!("{error:#}"))
            .ok()
    }
}
