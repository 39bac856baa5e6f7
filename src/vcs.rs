use log::debug;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{DocGateError, Result};

/// Read-only view of the version-control history the resolver inspects.
pub(crate) trait Repository {
    /// Full message of `commit`.
    async fn commit_message(&self, commit: &str) -> Result<String>;

    /// Paths changed between `base` and `commit`, in diff order.
    async fn diff_paths(&self, base: &str, commit: &str) -> Result<Vec<String>>;
}

/// [`Repository`] backed by the `git` executable.
pub struct GitCli {
    workdir: PathBuf,
    remote: String,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            workdir: workdir.into(),
            remote: remote.into(),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        debug!("Running git {}", args.join(" "));

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(DocGateError::Git {
                command: args.join(" "),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Branch name of `base` when it is a remote-tracking ref of our remote.
    fn remote_branch<'b>(&self, base: &'b str) -> Option<&'b str> {
        base.strip_prefix(self.remote.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|branch| !branch.is_empty())
    }
}

impl Repository for GitCli {
    async fn commit_message(&self, commit: &str) -> Result<String> {
        self.git(&["log", "--format=%B", "-n", "1", commit]).await
    }

    async fn diff_paths(&self, base: &str, commit: &str) -> Result<Vec<String>> {
        // CI checkouts are usually shallow, so the base branch has to be fetched first
        if let Some(branch) = self.remote_branch(base) {
            self.git(&["fetch", self.remote.as_str(), branch]).await?;
        }

        let range = format!("{base}...{commit}");
        let stdout = self.git(&["diff", "--name-only", range.as_str()]).await?;

        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
