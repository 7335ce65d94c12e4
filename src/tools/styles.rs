//! Style transform chain invocation

use crate::core::config::StyleConfig;
use crate::core::task::resolve;
use crate::tools::subprocess::{require_file, CommandRunner};
use crate::tools::{staging_dir, Artifact, AssetCompiler, CompileRequest, ToolError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the generated transform-chain config inside the staging directory
pub const GENERATED_CONFIG: &str = "postcss.config.js";

/// Plugin that receives the design-token config path
const UTILITY_PLUGIN: &str = "tailwindcss";

/// Compiles one entry stylesheet through an external CSS transform CLI
///
/// Plugins run in configuration order: import inlining, then utility
/// generation, then vendor prefixing. The chain is written to a config file
/// in the staging directory so the utility plugin gets its config path
/// explicitly.
#[derive(Debug, Clone)]
pub struct StyleChain {
    runner: CommandRunner,
    args: Vec<String>,
    config: String,
    plugins: Vec<String>,
}

impl StyleChain {
    pub fn new(config: &StyleConfig) -> Self {
        let runner = CommandRunner::new(config.program.clone(), config.timeout_secs)
            .with_env(config.env.clone());

        Self {
            runner,
            args: config.args.clone(),
            config: config.config.clone(),
            plugins: config.plugins.clone(),
        }
    }

    /// Design-token config for a project root
    pub fn config_path(&self, root: &Path) -> PathBuf {
        resolve(root, &self.config)
    }

    /// Full argument list for one build
    pub fn build_args(&self, request: &CompileRequest, staging: &Path, staged: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(request.entry.display().to_string());
        args.push("--config".to_string());
        args.push(staging.display().to_string());
        args.push("--output".to_string());
        args.push(staged.display().to_string());
        args
    }

    /// Transform-chain config listing the plugins in order
    ///
    /// Plugin packages are resolved from the project root.
    pub fn render_config(&self, root: &Path) -> String {
        let config = js_string(&self.config_path(root).display().to_string());

        let plugins: Vec<String> = self
            .plugins
            .iter()
            .map(|plugin| {
                let options = if plugin == UTILITY_PLUGIN {
                    format!("{{ config: {} }}", config)
                } else {
                    String::new()
                };
                format!(
                    "    require(require.resolve({}, {{ paths: [root] }}))({}),",
                    js_string(plugin),
                    options
                )
            })
            .collect();

        format!(
            "const root = {};\n\nmodule.exports = {{\n  plugins: [\n{}\n  ],\n}};\n",
            js_string(&root.display().to_string()),
            plugins.join("\n")
        )
    }
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}

#[async_trait]
impl AssetCompiler for StyleChain {
    async fn compile(&self, request: &CompileRequest) -> Result<Artifact, ToolError> {
        require_file(&request.entry)?;
        require_file(&self.config_path(&request.root))?;

        let staging = staging_dir()?;
        tokio::fs::write(
            staging.path().join(GENERATED_CONFIG),
            self.render_config(&request.root),
        )
        .await?;

        let staged = staging.path().join(&request.output_name);
        let args = self.build_args(request, staging.path(), &staged);
        info!("Compiling {}", request.entry.display());

        self.runner
            .run_staged(&args, &[], &request.root, &staged)
            .await
    }
}
