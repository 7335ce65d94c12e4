//! Module bundler invocation

use crate::core::config::BundlerConfig;
use crate::tools::subprocess::{require_file, CommandRunner};
use crate::tools::{extra_files, staging_dir, Artifact, AssetCompiler, CompileRequest, ToolError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the generated bundler config inside the staging directory
pub const GENERATED_CONFIG: &str = "webpack.config.js";

/// Bundles one JavaScript entry point through an external bundler CLI
///
/// The bundler writes into a private staging directory. Only a complete
/// bundle is read back, so a failed build never yields a partial artifact.
/// Without a project config file, a config carrying the source transform
/// and the global-symbol shim is generated next to the staged output.
#[derive(Debug, Clone)]
pub struct Bundler {
    runner: CommandRunner,
    args: Vec<String>,
    config: Option<PathBuf>,
    bail: bool,
    loader: Option<String>,
    provide: BTreeMap<String, String>,
}

impl Bundler {
    pub fn new(config: &BundlerConfig) -> Self {
        let runner = CommandRunner::new(config.program.clone(), config.timeout_secs)
            .with_env(config.env.clone());

        Self {
            runner,
            args: config.args.clone(),
            config: config.config.as_ref().map(PathBuf::from),
            bail: config.bail,
            loader: config.loader.clone(),
            provide: config.provide.clone(),
        }
    }

    /// Config file passed as `--config`: the project's own, or the generated one
    fn config_file(&self, request: &CompileRequest, staging: &Path) -> PathBuf {
        match &self.config {
            Some(config) => request.root.join(config),
            None => staging.join(GENERATED_CONFIG),
        }
    }

    /// Full argument list for one build
    pub fn build_args(&self, request: &CompileRequest, staging: &Path) -> Vec<String> {
        let mut args = self.args.clone();

        args.push("--config".to_string());
        args.push(self.config_file(request, staging).display().to_string());

        args.push("--entry".to_string());
        args.push(request.entry.display().to_string());
        args.push("--output-path".to_string());
        args.push(staging.display().to_string());
        args.push("--output-filename".to_string());
        args.push(request.output_name.clone());

        if self.bail {
            args.push("--bail".to_string());
        }

        // A project config exported as a function receives the shim through env
        if self.config.is_some() {
            for (symbol, module) in &self.provide {
                args.push("--env".to_string());
                args.push(format!("provide.{}={}", symbol, module));
            }
        }

        args
    }

    /// Bundler config applying the transform loader and the provide shim
    ///
    /// Tool packages are resolved from the project root, since the file
    /// itself lives in the staging directory.
    pub fn render_config(&self, request: &CompileRequest, staging: &Path) -> String {
        let root = js_string(&request.root.display().to_string());
        let provide = serde_json::to_string(&self.provide).unwrap_or_else(|_| "{}".to_string());

        let rules = match &self.loader {
            Some(loader) => format!(
                "[{{ test: /\\.js$/, exclude: /node_modules/, use: {{ loader: require.resolve({}, {{ paths: [root] }}) }} }}]",
                js_string(loader)
            ),
            None => "[]".to_string(),
        };

        format!(
            r#"const root = {root};
const webpack = require(require.resolve("webpack", {{ paths: [root] }}));

module.exports = {{
  mode: "production",
  context: root,
  entry: {entry},
  output: {{ path: {output}, filename: {filename} }},
  bail: {bail},
  module: {{ rules: {rules} }},
  resolveLoader: {{ modules: [require("path").join(root, "node_modules"), "node_modules"] }},
  plugins: [new webpack.ProvidePlugin({provide})],
}};
"#,
            root = root,
            entry = js_string(&request.entry.display().to_string()),
            output = js_string(&staging.display().to_string()),
            filename = js_string(&request.output_name),
            bail = self.bail,
            rules = rules,
            provide = provide,
        )
    }
}

/// Quote a value as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}

#[async_trait]
impl AssetCompiler for Bundler {
    async fn compile(&self, request: &CompileRequest) -> Result<Artifact, ToolError> {
        require_file(&request.entry)?;

        let staging = staging_dir()?;
        if self.config.is_none() {
            let rendered = self.render_config(request, staging.path());
            tokio::fs::write(staging.path().join(GENERATED_CONFIG), rendered).await?;
        }

        let args = self.build_args(request, staging.path());
        info!("Bundling {}", request.entry.display());

        let artifact = self
            .runner
            .run_staged(
                &args,
                &[],
                &request.root,
                &staging.path().join(&request.output_name),
            )
            .await?;

        let dropped = extra_files(staging.path(), &[request.output_name.as_str(), GENERATED_CONFIG]);
        if !dropped.is_empty() {
            debug!(
                "Bundler also emitted {}, which will not be kept",
                dropped.join(", ")
            );
        }

        Ok(artifact)
    }
}
