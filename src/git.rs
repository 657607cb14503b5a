use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::ExitStatus;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

/// How a git invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitExit {
    Success,
    /// Non-zero exit; `None` when terminated by a signal
    Failed(Option<i32>),
}

impl GitExit {
    pub fn success(&self) -> bool {
        matches!(self, GitExit::Success)
    }
}

impl From<ExitStatus> for GitExit {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            GitExit::Success
        } else {
            GitExit::Failed(status.code())
        }
    }
}

/// The two git operations a mirror run needs.
///
/// `Err` is reserved for failing to run git at all; a git process that
/// starts and exits non-zero is reported through [`GitExit`].
#[async_trait]
pub trait Git: Send + Sync {
    /// `git clone --mirror <url> <local_name>` inside `target`
    async fn mirror_clone(&self, url: &str, local_name: &str, target: &Path) -> Result<GitExit>;

    /// `git fetch --all --prune` inside an existing mirror
    async fn fetch_prune(&self, repo_dir: &Path) -> Result<GitExit>;
}

/// Runs the `git` executable found on `PATH`, inheriting stdio so git's
/// own progress output reaches the console
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl GitCli {
    pub fn new() -> Self {
        Self {
            program: "git".to_string(),
        }
    }

    /// Use a specific git executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Git for GitCli {
    async fn mirror_clone(&self, url: &str, local_name: &str, target: &Path) -> Result<GitExit> {
        debug!("git clone --mirror {} {} (in {})", url, local_name, target.display());

        let status = AsyncCommand::new(&self.program)
            .args(["clone", "--mirror", url, local_name])
            .current_dir(target)
            .status()
            .await
            .context("Failed to execute git clone")?;

        Ok(status.into())
    }

    async fn fetch_prune(&self, repo_dir: &Path) -> Result<GitExit> {
        debug!("git fetch --all --prune (in {})", repo_dir.display());

        let status = AsyncCommand::new(&self.program)
            .args(["fetch", "--all", "--prune"])
            .current_dir(repo_dir)
            .status()
            .await
            .context("Failed to execute git fetch")?;

        Ok(status.into())
    }
}
