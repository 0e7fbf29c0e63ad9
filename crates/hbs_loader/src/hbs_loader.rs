//! Bundler load stage for Handlebars templates.
//!
//! Each matching file is precompiled into an ES module that imports the
//! Handlebars runtime, imports and registers the configured helpers the
//! template calls, and default-exports the template. Results are cached per
//! build until the file's modification time moves forward.

mod cache;
mod discovery;
mod fs;
mod module;
mod options;
mod pipeline;
mod plugin;
mod registry;
mod resolve;

pub use cache::{CacheEntry, CacheStats, CompileCache};
pub use discovery::HelperDiscovery;
#[cfg(any(test, feature = "test-support"))]
pub use fs::FakeFs;
pub use fs::{Fs, RealFs};
pub use module::{CompiledModule, Location, Message};
pub use options::{DEFAULT_FILTER, PluginOptions};
pub use pipeline::{RUNTIME_IMPORT, compile_template};
pub use plugin::{
    HandlebarsLoader, HandlebarsPlugin, OnLoadArgs, OnLoadCallback, OnLoadOptions, Plugin,
    PluginBuild,
};
pub use registry::HelperRegistry;
pub use resolve::{ModuleProbe, probe_entry, resolve_in_dirs};

pub use hbs_compiler::PrecompileOptions;
