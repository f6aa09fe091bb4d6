// crates/go_env/src/lib.rs

//! Resolves the `GOOS` / `GOARCH` / `CGO_ENABLED` assignments for the build
//! subprocess and renders them for the host shell.

use std::process::{Command, Stdio};

use build_options::{BuildConfig, CgoEnabled};

pub const GOOS: &str = "GOOS";
pub const GOARCH: &str = "GOARCH";
pub const CGO_ENABLED: &str = "CGO_ENABLED";

/// Shell syntax used when echoing environment assignments.
///
/// The choice follows the machine running the build, not the target: a
/// Windows host echoes `set K=V&&` chains even when cross-compiling for linux.
/// Only the echoed text depends on the shell; the subprocess always gets the
/// assignments through [`GoEnv::apply_to`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostShell {
    Windows,
    Posix,
}

impl HostShell {
    /// The shell of the machine this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            HostShell::Windows
        } else {
            HostShell::Posix
        }
    }

    /// Renders `vars` as the prefix of a shell command line.
    pub fn render_prefix(self, vars: &[(&str, &str)]) -> String {
        match self {
            HostShell::Windows => vars
                .iter()
                .map(|(key, value)| format!("set {}={}&&", key, value))
                .collect(),
            HostShell::Posix => vars
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// The environment assignments the build runs under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoEnv {
    pub goos: String,
    pub goarch: String,
    pub cgo_enabled: CgoEnabled,
}

impl GoEnv {
    /// Assignments in the order they are echoed.
    pub fn vars(&self) -> [(&'static str, &str); 3] {
        [
            (GOOS, self.goos.as_str()),
            (GOARCH, self.goarch.as_str()),
            (CGO_ENABLED, self.cgo_enabled.as_str()),
        ]
    }

    pub fn prefix(&self, shell: HostShell) -> String {
        shell.render_prefix(&self.vars())
    }

    /// Sets the assignments on `command` only; the parent environment is untouched.
    pub fn apply_to(&self, command: &mut Command) {
        for (key, value) in self.vars() {
            command.env(key, value);
        }
    }
}

/// Asks a toolchain for one of its environment defaults.
pub trait ToolchainEnv {
    /// Returns `None` when the toolchain cannot answer.
    fn query(&self, key: &str) -> Option<String>;
}

/// `go env <KEY>` against the `go` found on `PATH`.
pub struct GoToolchain {
    pub program: String,
}

impl Default for GoToolchain {
    fn default() -> Self {
        GoToolchain {
            program: "go".to_string(),
        }
    }
}

impl ToolchainEnv for GoToolchain {
    fn query(&self, key: &str) -> Option<String> {
        let output = match Command::new(&self.program)
            .args(["env", key])
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                log::debug!("failed to run {} env {}: {}", self.program, key, err);
                return None;
            }
        };
        if !output.status.success() {
            log::debug!("{} env {} exited with {}", self.program, key, output.status);
            return None;
        }
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Uses the configured target where given and the toolchain's default
/// otherwise. The toolchain is only consulted for unset fields.
pub fn resolve_go_env(config: &BuildConfig, toolchain: &dyn ToolchainEnv) -> GoEnv {
    let goos = resolve_one(config.target_os.as_deref(), GOOS, toolchain);
    let goarch = resolve_one(config.target_arch.as_deref(), GOARCH, toolchain);
    GoEnv {
        goos,
        goarch,
        cgo_enabled: config.cgo_enabled,
    }
}

fn resolve_one(configured: Option<&str>, key: &str, toolchain: &dyn ToolchainEnv) -> String {
    if let Some(value) = configured {
        return value.to_string();
    }
    match toolchain.query(key) {
        Some(value) => {
            log::debug!("host toolchain default {}={}", key, value);
            value
        }
        None => {
            // An empty value reads as unset to the go command.
            log::warn!("could not query {} from the go toolchain; leaving it empty", key);
            String::new()
        }
    }
}
