use std::path::PathBuf;
use std::process::{Command, Output};

#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("`git` binary is not available in PATH")]
    MissingBinary,
    #[error("failed to run `git {command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`git {command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Version-control operations the staleness detector depends on.
pub trait VersionControl: Sync {
    /// Paths of every worktree the repository knows about.
    fn list_worktree_paths(&self) -> Result<Vec<PathBuf>, VcsError>;
    fn branch_exists(&self, branch: &str) -> Result<bool, VcsError>;
    fn delete_branch(&self, branch: &str) -> Result<(), VcsError>;
    /// Drops bookkeeping for worktrees whose directories are gone, so their
    /// branches are no longer reported as checked out.
    fn prune_worktrees(&self) -> Result<(), VcsError>;
}

/// `git` CLI bound to one repository via `git -C <repo>`.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    fn run(&self, args: &[&str]) -> Result<Output, VcsError> {
        Command::new("git")
            .arg("-C")
            .arg(&self.repo)
            .args(args)
            .output()
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    VcsError::MissingBinary
                } else {
                    VcsError::Spawn {
                        command: args.join(" "),
                        source,
                    }
                }
            })
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output, VcsError> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(failed(args, &output));
        }
        Ok(output)
    }
}

fn failed(args: &[&str], output: &Output) -> VcsError {
    VcsError::Failed {
        command: args.join(" "),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

impl VersionControl for GitCli {
    fn list_worktree_paths(&self) -> Result<Vec<PathBuf>, VcsError> {
        let output = self.run_checked(&["worktree", "list", "--porcelain"])?;
        Ok(parse_worktree_porcelain(&String::from_utf8_lossy(
            &output.stdout,
        )))
    }

    fn branch_exists(&self, branch: &str) -> Result<bool, VcsError> {
        let reference = format!("refs/heads/{branch}");
        let args = ["rev-parse", "--verify", "--quiet", reference.as_str()];
        let output = self.run(&args)?;
        if output.status.success() {
            return Ok(true);
        }
        // `--quiet` reports a missing ref with exit code 1 and no output.
        if output.status.code() == Some(1) {
            return Ok(false);
        }
        Err(failed(&args, &output))
    }

    fn delete_branch(&self, branch: &str) -> Result<(), VcsError> {
        self.run_checked(&["branch", "-D", branch])?;
        Ok(())
    }

    fn prune_worktrees(&self) -> Result<(), VcsError> {
        self.run_checked(&["worktree", "prune"])?;
        Ok(())
    }
}

/// Extracts worktree paths from `git worktree list --porcelain`.
pub fn parse_worktree_porcelain(output: &str) -> Vec<PathBuf> {
    output
        .lines()
        .filter_map(|line| line.strip_prefix("worktree "))
        .map(|path| PathBuf::from(path.trim_end()))
        .collect()
}
