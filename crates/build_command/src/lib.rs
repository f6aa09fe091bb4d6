// crates/build_command/src/lib.rs

//! Composes the `go build` / `go install` invocation.
//!
//! The command is kept as structured parts. [`BuildCommand::args`] is what the
//! subprocess receives; [`BuildCommand::display`] is the shell-style line that
//! gets echoed to the user and logged.

use std::fmt;
use std::process::{Command, ExitStatus};

use build_options::BuildConfig;
use go_env::{GoEnv, HostShell};
use ldflags::{build_linker_flags, BuildInfo};
use thiserror::Error;

/// Value of `-gcflags` in debug builds: no optimizations, no inlining.
pub const DEBUG_GCFLAGS: &str = "all=-N -l";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Build,
    Install,
}

impl Mode {
    pub fn subcommand(self) -> &'static str {
        match self {
            Mode::Build => "build",
            Mode::Install => "install",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildCommand {
    pub shell: HostShell,
    pub env: GoEnv,
    pub program: String,
    pub mode: Mode,
    pub debug: bool,
    /// Space-joined `-X` assignments.
    pub ldflags: String,
    /// Always `None` in install mode.
    pub output_path: Option<String>,
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    SubprocessFailure { command: String, status: ExitStatus },
}

/// Assembles the invocation for `config`. Pure: identical inputs give
/// identical commands.
pub fn compose_command(
    config: &BuildConfig,
    env: GoEnv,
    shell: HostShell,
    info: &BuildInfo,
) -> BuildCommand {
    let mode = if config.install {
        Mode::Install
    } else {
        Mode::Build
    };
    let output_path = match mode {
        Mode::Build => config.output_path.clone(),
        Mode::Install => None,
    };

    BuildCommand {
        shell,
        env,
        program: "go".to_string(),
        mode,
        debug: config.debug,
        ldflags: build_linker_flags(config, info).join(" "),
        output_path,
    }
}

impl BuildCommand {
    /// Arguments after the program name, exactly as the subprocess gets them.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.mode.subcommand().to_string()];
        if self.debug {
            args.push(format!("-gcflags={}", DEBUG_GCFLAGS));
        }
        args.push("-ldflags".to_string());
        args.push(self.ldflags.clone());
        if let Some(output) = &self.output_path {
            args.push("-o".to_string());
            args.push(output.clone());
        }
        args
    }

    /// Shell-style rendering, e.g.
    /// `GOOS=linux GOARCH=amd64 CGO_ENABLED=0 go build -ldflags "-X '...'"`.
    pub fn display(&self) -> String {
        let mut parts = vec![
            self.env.prefix(self.shell),
            self.program.clone(),
            self.mode.subcommand().to_string(),
        ];
        if self.debug {
            parts.push("-gcflags=all=\"-N -l\"".to_string());
        }
        parts.push(format!("-ldflags \"{}\"", self.ldflags));
        if let Some(output) = &self.output_path {
            parts.push(format!("-o {}", output));
        }
        parts.join(" ")
    }

    /// A ready-to-spawn process with the env assignments applied to it alone.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.args());
        self.env.apply_to(&mut command);
        command
    }

    /// Runs the command with inherited stdout/stderr and waits for it.
    ///
    /// # Errors
    ///
    /// [`ExecuteError::Spawn`] if the program cannot be started and
    /// [`ExecuteError::SubprocessFailure`] on a non-zero exit.
    pub fn run(&self) -> Result<(), ExecuteError> {
        log::debug!("running {} {:?}", self.program, self.args());
        let status = self
            .to_command()
            .status()
            .map_err(|source| ExecuteError::Spawn {
                command: self.display(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(ExecuteError::SubprocessFailure {
                command: self.display(),
                status,
            })
        }
    }
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use build_options::CgoEnabled;

    fn linux_env() -> GoEnv {
        GoEnv {
            goos: "linux".to_string(),
            goarch: "amd64".to_string(),
            cgo_enabled: CgoEnabled::Disabled,
        }
    }

    fn info() -> BuildInfo {
        BuildInfo {
            software_version: "1.1.0".to_string(),
            tag: Some("main".to_string()),
            commit_id: Some("abc1234".to_string()),
            time: "2024-03-09 07:05:01".to_string(),
        }
    }

    fn compose(config: &BuildConfig) -> BuildCommand {
        compose_command(config, linux_env(), HostShell::Posix, &info())
    }

    #[test]
    fn test_default_build_display() {
        let command = compose(&BuildConfig::default());
        assert_eq!(
            command.display(),
            "GOOS=linux GOARCH=amd64 CGO_ENABLED=0 go build -ldflags \"\
             -X 'github.com/zgsm-ai/smc/cmd.SoftwareVer=1.1.0' \
             -X 'github.com/zgsm-ai/smc/cmd.BuildTag=main' \
             -X 'github.com/zgsm-ai/smc/cmd.BuildCommitId=abc1234' \
             -X 'github.com/zgsm-ai/smc/cmd.BuildTime=2024-03-09 07:05:01'\""
        );
        assert_eq!(command.to_string(), command.display());
    }

    #[test]
    fn test_args_are_unquoted() {
        let command = compose(&BuildConfig::default());
        let args = command.args();
        assert_eq!(args.len(), 3);
        assert_eq!(args[0], "build");
        assert_eq!(args[1], "-ldflags");
        assert!(args[2].starts_with("-X 'github.com/zgsm-ai/smc/cmd.SoftwareVer=1.1.0'"));
        assert!(!args[2].starts_with('"'));
    }

    #[test]
    fn test_exactly_one_ldflags_block() {
        let config = BuildConfig {
            debug: true,
            output_path: Some("out/smc".to_string()),
            ..BuildConfig::default()
        };
        let command = compose(&config);
        assert_eq!(command.args().iter().filter(|a| *a == "-ldflags").count(), 1);
        assert_eq!(command.display().matches("-ldflags").count(), 1);
    }

    #[test]
    fn test_debug_flags() {
        let config = BuildConfig {
            debug: true,
            ..BuildConfig::default()
        };
        let command = compose(&config);
        assert_eq!(command.args()[1], "-gcflags=all=-N -l");
        assert!(command.display().contains(" go build -gcflags=all=\"-N -l\" -ldflags "));
    }

    #[test]
    fn test_build_mode_with_output() {
        let config = BuildConfig {
            output_path: Some("bin/smc".to_string()),
            ..BuildConfig::default()
        };
        let command = compose(&config);
        let args = command.args();
        assert_eq!(&args[args.len() - 2..], ["-o", "bin/smc"]);
        assert!(command.display().ends_with("'\" -o bin/smc"));
    }

    #[test]
    fn test_build_mode_without_output_has_no_o_flag() {
        let command = compose(&BuildConfig::default());
        assert!(!command.args().iter().any(|a| a == "-o"));
        assert!(!command.display().contains(" -o "));
    }

    #[test]
    fn test_install_mode_ignores_output() {
        let config = BuildConfig {
            install: true,
            output_path: Some("bin/smc".to_string()),
            ..BuildConfig::default()
        };
        let command = compose(&config);
        assert_eq!(command.mode, Mode::Install);
        assert_eq!(command.args()[0], "install");
        assert!(!command.args().iter().any(|a| a == "-o" || a == "bin/smc"));
        assert!(command.display().contains(" go install -ldflags "));
        assert!(!command.display().contains("bin/smc"));
    }

    #[test]
    fn test_windows_host_display() {
        let command = compose_command(&BuildConfig::default(), linux_env(), HostShell::Windows, &info());
        assert!(command
            .display()
            .starts_with("set GOOS=linux&&set GOARCH=amd64&&set CGO_ENABLED=0&& go build -ldflags \""));
    }

    #[test]
    fn test_compose_is_deterministic() {
        let config = BuildConfig {
            debug: true,
            app_name: "foo".to_string(),
            output_path: Some("foo.bin".to_string()),
            ..BuildConfig::default()
        };
        let first = compose(&config);
        let second = compose(&config);
        assert_eq!(first, second);
        assert_eq!(first.display(), second.display());
    }

    #[test]
    fn test_to_command_carries_env_and_args() {
        let command = compose(&BuildConfig::default());
        let process = command.to_command();
        assert_eq!(process.get_program(), "go");
        let args: Vec<_> = process.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, command.args());
        let goos = process
            .get_envs()
            .find(|(k, _)| *k == "GOOS")
            .and_then(|(_, v)| v)
            .map(|v| v.to_string_lossy().into_owned());
        assert_eq!(goos.as_deref(), Some("linux"));
    }

    #[test]
    fn test_run_missing_program_is_spawn_error() {
        let mut command = compose(&BuildConfig::default());
        command.program = "definitely-not-a-go-binary-on-path".to_string();
        assert!(matches!(command.run(), Err(ExecuteError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_reports_exit_status() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::tempdir;

        let dir = tempdir().expect("Failed to create temp dir");
        let record = dir.path().join("record.txt");
        let script = dir.path().join("fake-go");
        fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$GOOS $GOARCH $CGO_ENABLED $1\" > \"{}\"\n[ \"$1\" = install ] && exit 3\nexit 0\n",
                record.display()
            ),
        )
        .expect("Failed to write script");
        let mut perms = fs::metadata(&script).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script, perms).expect("Failed to set permissions");

        let mut command = compose(&BuildConfig::default());
        command.program = script.to_string_lossy().into_owned();
        assert!(command.run().is_ok());
        let recorded = fs::read_to_string(&record).expect("Failed to read record");
        assert_eq!(recorded.trim(), "linux amd64 0 build");

        command.mode = Mode::Install;
        match command.run() {
            Err(ExecuteError::SubprocessFailure { status, .. }) => assert_eq!(status.code(), Some(3)),
            other => panic!("expected a subprocess failure, got {:?}", other),
        }
    }
}
