//! Ephemeral local clone of a remote repository.
//!
//! A [`Workspace`] owns a uniquely named temporary directory. The directory
//! is removed when the workspace is dropped, whether the run finished,
//! returned early, or unwound from a panic. [`Workspace::close`] removes it
//! eagerly and reports removal errors instead of swallowing them.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use thiserror::Error;

use crate::config::AcquisitionConfig;

const WORKSPACE_PREFIX: &str = "repo-context-";

/// Fatal failure to materialize a repository.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("unsupported repository location: '{0}'")]
    UnsupportedUrl(String),
    #[error("failed to create workspace directory: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("failed to execute 'git clone'. Is git installed? {0}")]
    GitLaunch(#[source] std::io::Error),
    #[error("git clone of '{url}' failed: {message}")]
    Clone { url: String, message: String },
}

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    url: String,
    created_at: DateTime<Utc>,
}

impl Workspace {
    /// Clone `url` into a fresh workspace.
    ///
    /// The remote's default branch is checked out unless
    /// [`AcquisitionConfig::branch`] names another one. On failure no
    /// directory is left behind.
    pub fn acquire(url: &str, config: &AcquisitionConfig) -> Result<Self, AcquisitionError> {
        let url = url.trim();
        check_location(url)?;

        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match &config.workspace_parent {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(AcquisitionError::Workspace)?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
        .map_err(AcquisitionError::Workspace)?;

        tracing::info!(url, path = %dir.path().display(), "Cloning repository");
        // `dir` drops (and is removed) if the clone fails.
        git_clone(url, config, dir.path())?;
        tracing::info!(url, path = %dir.path().display(), "Clone finished");

        Ok(Self {
            dir,
            url: url.to_string(),
            created_at: Utc::now(),
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Remove the workspace now, reporting any removal error.
    pub fn close(self) -> std::io::Result<()> {
        let path = self.dir.path().to_path_buf();
        let result = self.dir.close();
        match &result {
            Ok(()) => tracing::debug!(path = %path.display(), "Workspace removed"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove workspace"),
        }
        result
    }
}

/// Reject locations git would misread or that no transport can serve.
fn check_location(url: &str) -> Result<(), AcquisitionError> {
    let unsupported = || AcquisitionError::UnsupportedUrl(url.to_string());

    if url.is_empty() || url.starts_with('-') {
        return Err(unsupported());
    }

    if let Some((scheme, rest)) = url.split_once("://") {
        return match scheme.to_ascii_lowercase().as_str() {
            "https" | "http" | "ssh" | "git" | "file" if !rest.is_empty() => Ok(()),
            _ => Err(unsupported()),
        };
    }

    // scp-like syntax: [user@]host:path, where no slash precedes the colon
    if let Some((host, path)) = url.split_once(':') {
        if !host.is_empty() && !host.contains('/') && !path.is_empty() && host.len() > 1 {
            return Ok(());
        }
    }

    if Path::new(url).exists() {
        return Ok(());
    }

    Err(unsupported())
}

/// Build the non-interactive `git clone` invocation.
fn clone_command(url: &str, config: &AcquisitionConfig, dest: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("clone").arg("--quiet");
    if let Some(branch) = &config.branch {
        cmd.args(["--branch", branch, "--single-branch"]);
    }
    if config.shallow {
        cmd.args(["--depth", "1"]);
    }
    cmd.arg("--").arg(url).arg(dest);
    // Fail instead of blocking on a credential, passphrase or host-key prompt.
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    if std::env::var_os("GIT_SSH_COMMAND").is_none() {
        cmd.env("GIT_SSH_COMMAND", "ssh -o BatchMode=yes");
    }
    cmd
}

fn git_clone(url: &str, config: &AcquisitionConfig, dest: &Path) -> Result<(), AcquisitionError> {
    let mut cmd = clone_command(url, config, dest);
    let output = cmd.output().map_err(AcquisitionError::GitLaunch)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!(url, status = %output.status, "git clone failed");
        return Err(AcquisitionError::Clone {
            url: url.to_string(),
            message: stderr.trim().to_string(),
        });
    }

    Ok(())
}
