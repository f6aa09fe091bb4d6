// crates/ldflags/src/lib.rs

//! Linker `-X` assignments that stamp version metadata into the Go binary.

use build_options::BuildConfig;
use chrono::NaiveDateTime;
use git_metadata::VersionControl;

/// Format of the `BuildTime` value, e.g. `2024-05-01 13:45:10`.
pub const BUILD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Module path of the application the symbols belong to.
pub fn module_path(app_name: &str) -> String {
    format!("github.com/zgsm-ai/{}", app_name)
}

/// Values injected through the linker, gathered once per invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildInfo {
    pub software_version: String,
    pub tag: Option<String>,
    pub commit_id: Option<String>,
    pub time: String,
}

/// Queries version control and formats `now`.
pub fn collect_build_info(
    config: &BuildConfig,
    vcs: &dyn VersionControl,
    now: NaiveDateTime,
) -> BuildInfo {
    let tag = vcs.current_branch();
    if tag.is_none() {
        log::debug!("no branch name available; BuildTag is omitted");
    }
    let commit_id = vcs.head_commit_id();
    if commit_id.is_none() {
        log::debug!("no commit id available; BuildCommitId is omitted");
    }

    BuildInfo {
        software_version: config.software_version.clone(),
        tag,
        commit_id,
        time: now.format(BUILD_TIME_FORMAT).to_string(),
    }
}

fn assignment(module: &str, field: &str, value: &str) -> String {
    format!("-X '{}/cmd.{}={}'", module, field, value)
}

/// One `-X` flag per value: `SoftwareVer`, then `BuildTag` and `BuildCommitId`
/// when known, then `BuildTime`.
pub fn build_linker_flags(config: &BuildConfig, info: &BuildInfo) -> Vec<String> {
    let module = module_path(&config.app_name);
    let mut flags = vec![assignment(&module, "SoftwareVer", &info.software_version)];

    if let Some(tag) = info.tag.as_deref().filter(|t| !t.is_empty()) {
        flags.push(assignment(&module, "BuildTag", tag));
    }
    if let Some(commit_id) = info.commit_id.as_deref().filter(|c| !c.is_empty()) {
        flags.push(assignment(&module, "BuildCommitId", commit_id));
    }

    flags.push(assignment(&module, "BuildTime", &info.time));
    flags
}
