//! Implementation of the `genagent init` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::output::{output, CommandOutput};
use crate::infrastructure::setup::{
    create_catalog_file, create_config_dir, create_config_file, SetupPaths,
};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite existing configuration and catalog files
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub files_written: Vec<String>,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.files_written.is_empty() {
            lines.push("\nWrote:".to_string());
            for file in &self.files_written {
                lines.push(format!("  - {file}"));
            }
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };
    let paths = SetupPaths::in_dir(&target_path);

    if paths.is_initialized() && !args.force {
        let out = InitOutput {
            success: false,
            message: "Project already initialized. Use --force to overwrite.".to_string(),
            initialized_path: target_path,
            files_written: vec![],
        };
        output(&out, json_mode);
        return Ok(());
    }

    create_config_dir(&paths)?;
    let mut files_written = Vec::new();
    if create_config_file(&paths, args.force)? {
        files_written.push(paths.config_file.display().to_string());
    }
    if create_catalog_file(&paths, args.force)? {
        files_written.push(paths.catalog_file.display().to_string());
    }

    let out = InitOutput {
        success: true,
        message: format!("Initialized genagent project in {}", target_path.display()),
        initialized_path: target_path,
        files_written,
    };
    output(&out, json_mode);
    Ok(())
}
