//! Project initialization
//!
//! Creates the project-local `.genagent/` directory with a default
//! configuration file and a starter agent catalog.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Default configuration template content
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# genagent configuration
# Override settings by editing this file or setting environment variables
# with the GENAGENT_ prefix, using __ for nesting.
#
# Example environment variables:
#   export GENAGENT_LOGGING__LEVEL=debug
#   export GENAGENT_KNOWLEDGE__TOP_K=8
#   export GENAGENT_PROVIDERS__OPENAI__API_KEY=sk-...

logging:
  # Log level: trace, debug, info, warn, error
  level: "info"
  # Console format: json, pretty
  format: "pretty"

database:
  # SQLite file holding knowledge chunks
  path: ".genagent/knowledge.db"
  max_connections: 5

knowledge:
  # Vector backend: sqlite, memory
  backend: "sqlite"
  chunk_size: 1000
  chunk_overlap: 200
  top_k: 5
  timeout_secs: 30
  embedding:
    # hashing (local, no network) or openai
    provider: "hashing"
    dimension: 384

runtime:
  model_timeout_secs: 120
  max_tool_rounds: 5
  memory:
    max_threads: 1000
    max_messages_per_thread: 200
    # 0 keeps idle threads until evicted
    idle_ttl_secs: 0

catalog_path: ".genagent/catalog.yaml"
"#;

/// Starter catalog with one offline agent
const DEFAULT_CATALOG_TEMPLATE: &str = r#"agents:
  - id: assistant
    name: Assistant
    provider: mock
    model: echo
    system_prompt: "Answer questions using the project knowledge base."
    knowledge_base_ids: [docs]
    tool_ids: [clock]
    is_active: false

tools:
  - id: clock
    name: current_time
    description: Current UTC time
    type: function
    function_config:
      code: current_time
"#;

/// Setup paths and directories
#[derive(Debug, Clone)]
pub struct SetupPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub catalog_file: PathBuf,
}

impl SetupPaths {
    /// Setup paths for the current directory
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(Self::in_dir(&current_dir))
    }

    /// Setup paths rooted at `root`
    pub fn in_dir(root: &Path) -> Self {
        let config_dir = root.join(".genagent");
        Self {
            config_file: config_dir.join("config.yaml"),
            catalog_file: config_dir.join("catalog.yaml"),
            config_dir,
        }
    }

    /// Check if the project is already initialized
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists() && self.catalog_file.exists()
    }
}

/// Create the configuration directory
pub fn create_config_dir(paths: &SetupPaths) -> Result<()> {
    fs::create_dir_all(&paths.config_dir).context("Failed to create config directory")
}

/// Create the default configuration file. Returns false when kept as is.
pub fn create_config_file(paths: &SetupPaths, force: bool) -> Result<bool> {
    write_template(&paths.config_file, DEFAULT_CONFIG_TEMPLATE, force)
        .context("Failed to write config file")
}

/// Create the starter catalog. Returns false when kept as is.
pub fn create_catalog_file(paths: &SetupPaths, force: bool) -> Result<bool> {
    write_template(&paths.catalog_file, DEFAULT_CATALOG_TEMPLATE, force)
        .context("Failed to write catalog file")
}

fn write_template(path: &Path, contents: &str, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    fs::write(path, contents)?;
    Ok(true)
}
