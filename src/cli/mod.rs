//! CLI shell: locates the project config, binds and validates it, then
//! dispatches to `scan` or `validate`.

pub mod scan;
pub mod validate;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::raw::RawValue;
use crate::config::schema::Config;
use crate::error::{Result, ShamashError};

const CONFIG_CANDIDATES: [&str; 2] = ["shamash/configs/asm.yml", "shamash/configs/asm.yaml"];

#[derive(Parser)]
#[command(name = "shamash")]
#[command(about = "Architectural constraint engine for JVM bytecode")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Bind and validate the project's config without scanning bytecode.
    Validate {
        #[arg(long, default_value = ".")]
        project: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run the full pipeline and report findings.
    Scan {
        #[arg(long, default_value = ".")]
        project: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Emit the finding list as JSON instead of one line per finding.
        #[arg(long)]
        json: bool,
    },
}

pub fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Validate { project, config } => validate::run(&project, config.as_deref()),
        Commands::Scan { project, config, json } => scan::run(&project, config.as_deref(), json),
    }
}

/// Locate the config file: an explicit `--config` path wins, otherwise the
/// first candidate under `shamash/configs/` relative to `project` that
/// exists on disk.
pub fn locate_config(project: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    for candidate in CONFIG_CANDIDATES {
        let path = project.join(candidate);
        if path.exists() {
            return Ok(path);
        }
    }
    Err(ShamashError::Bind {
        path: "project".to_string(),
        message: format!(
            "no config found under {} (looked for {})",
            project.display(),
            CONFIG_CANDIDATES.join(", ")
        ),
    })
}

/// Read and bind the config at `path` into a typed `Config`.
pub fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&text)?;
    let raw = RawValue::from(yaml);
    Ok(crate::config::bind(&raw)?)
}
