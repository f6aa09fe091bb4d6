// crates/git_metadata/src/lib.rs

//! Branch name and short commit id of the repository being built, read from `git`.

use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Version-control facts stamped into the binary.
///
/// Both queries are best effort: `None` means "leave it out", never an error.
pub trait VersionControl {
    /// Name of the checked-out branch (`HEAD` when detached).
    fn current_branch(&self) -> Option<String>;
    /// Abbreviated hash of the last commit.
    fn head_commit_id(&self) -> Option<String>;
}

/// Shells out to the `git` on `PATH`.
#[derive(Default)]
pub struct GitCli {
    /// Repository to query; the current directory when `None`.
    pub repo_dir: Option<PathBuf>,
}

impl GitCli {
    pub fn in_dir<P: Into<PathBuf>>(dir: P) -> Self {
        GitCli {
            repo_dir: Some(dir.into()),
        }
    }

    /// Runs git with `args` and returns trimmed stdout, or `None` on any failure
    /// or empty output.
    fn git_output(&self, args: &[&str]) -> Option<String> {
        let mut command = Command::new("git");
        command.args(args).stderr(Stdio::null());
        if let Some(dir) = &self.repo_dir {
            command.current_dir(dir);
        }

        let output = match command.output() {
            Ok(output) => output,
            Err(err) => {
                log::debug!("failed to execute git {}: {}", args.join(" "), err);
                return None;
            }
        };
        if !output.status.success() {
            log::debug!("git {} exited with {}", args.join(" "), output.status);
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            None
        } else {
            Some(stdout)
        }
    }
}

impl VersionControl for GitCli {
    fn current_branch(&self) -> Option<String> {
        self.git_output(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    fn head_commit_id(&self) -> Option<String> {
        self.git_output(&["log", "--pretty=format:%h", "-1"])
    }
}
