//! External compilers invoked by compile tasks

pub mod bundler;
pub mod error;
pub mod styles;
pub mod subprocess;

use crate::core::config::{ToolKind, ToolsConfig};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use bundler::Bundler;
pub use error::ToolError;
pub use styles::StyleChain;
pub use subprocess::CommandRunner;

/// What a compile task asks a compiler to build
#[derive(Debug, Clone)]
pub struct CompileRequest {
    /// Task on whose behalf the compiler runs
    pub task_id: String,

    /// Entry point (root of the import graph)
    pub entry: PathBuf,

    /// File name the result will be written under
    pub output_name: String,

    /// Project root, used as the working directory
    pub root: PathBuf,
}

/// A compiled, in-memory output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Trait for compilers - allows for different implementations
#[async_trait]
pub trait AssetCompiler: Send + Sync {
    /// Compile the request's entry point into a single artifact
    async fn compile(&self, request: &CompileRequest) -> Result<Artifact, ToolError>;
}

/// The compiler used for each tool kind
#[derive(Clone)]
pub struct Toolchain {
    bundler: Arc<dyn AssetCompiler>,
    styles: Arc<dyn AssetCompiler>,
}

impl Toolchain {
    pub fn new(bundler: Arc<dyn AssetCompiler>, styles: Arc<dyn AssetCompiler>) -> Self {
        Self { bundler, styles }
    }

    /// Build the real subprocess-backed toolchain
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(
            Arc::new(Bundler::new(&config.bundler)),
            Arc::new(StyleChain::new(&config.styles)),
        )
    }

    pub fn compiler(&self, tool: ToolKind) -> &dyn AssetCompiler {
        match tool {
            ToolKind::Bundler => self.bundler.as_ref(),
            ToolKind::Styles => self.styles.as_ref(),
        }
    }
}

impl std::fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain").finish_non_exhaustive()
    }
}

/// Files left in `dir` besides the ones in `keep`
pub(crate) fn extra_files(dir: &Path, keep: &[&str]) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut extra: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| !keep.contains(&name.as_str()))
        .collect();
    extra.sort();
    extra
}

/// Per-run scratch directory the external tool writes into
pub(crate) fn staging_dir() -> Result<tempfile::TempDir, ToolError> {
    Ok(tempfile::Builder::new().prefix("assets-").tempdir()?)
}
