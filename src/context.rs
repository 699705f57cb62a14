//! Workspace resolution for parley.
//!
//! Configuration lives in a `.parley/` directory at the top of a checkout:
//!
//! ```text
//! .parley/
//!   config.yaml      format rules, mention policy, trigger settings
//!   agents.yaml      agent roster and prompt template
//!   prompts/<agent>.md
//! ```
//!
//! Commands locate it by walking up from the working directory. Every file is
//! optional, so a checkout without `.parley/` runs on built-in defaults.

use crate::error::{ParleyError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the workspace directory.
pub const WORKSPACE_DIR: &str = ".parley";

/// Resolved workspace paths. All paths are absolute.
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    /// Directory holding `.parley/` (the working directory when none was found).
    pub root: PathBuf,

    /// Absolute path to `.parley/`, which may not exist.
    pub workspace_dir: PathBuf,
}

impl WorkspaceContext {
    /// Resolve the workspace from the current working directory.
    ///
    /// # Returns
    ///
    /// * `Ok(WorkspaceContext)` - Resolved context
    /// * `Err(ParleyError::UserError)` - The working directory is unreadable
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            ParleyError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Ok(Self::resolve_from(cwd))
    }

    /// Resolve the workspace from a specific directory.
    ///
    /// The nearest ancestor (including `start` itself) containing `.parley/`
    /// becomes the root.
    pub fn resolve_from<P: AsRef<Path>>(start: P) -> Self {
        let start = start.as_ref();
        let root = start
            .ancestors()
            .find(|dir| dir.join(WORKSPACE_DIR).is_dir())
            .unwrap_or(start)
            .to_path_buf();

        Self {
            workspace_dir: root.join(WORKSPACE_DIR),
            root,
        }
    }

    /// Check if the `.parley/` directory exists.
    pub fn exists(&self) -> bool {
        self.workspace_dir.is_dir()
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.workspace_dir.join("config.yaml")
    }

    /// Get the path to the agent roster.
    pub fn agents_path(&self) -> PathBuf {
        self.workspace_dir.join("agents.yaml")
    }

    /// Get the directory holding persona files.
    pub fn prompts_dir(&self) -> PathBuf {
        self.workspace_dir.join("prompts")
    }
}
