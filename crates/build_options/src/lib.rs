// crates/build_options/src/lib.rs

//! Command-line options for `go_build`.
//!
//! The parser produces one immutable [`BuildConfig`] that every later step
//! (env resolution, linker flags, command composition) borrows.

use std::ffi::OsString;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Arg, ArgAction, Command};
use thiserror::Error;

pub const DEFAULT_SOFTWARE_VERSION: &str = "1.1.0";
pub const DEFAULT_APP_NAME: &str = "smc";

/// Usage text printed for `-h`.
pub const USAGE: &str = "\
go_build [--debug] [--install] [--software VER] [--app APPNAME] [--os OS] [--arch ARCH] [--output OUTPUT] [--cgo_enabled 0/1]
  -d,--debug        编译调试版本
  -i,--install      把程序拷贝到安装目录
  -s,--software VER 指定软件版本,VER格式:x.x.x,如: 1.1.1210
  -a,--app APPNAME  当前构建的程序名字
  --os OS           指定目标操作系统,如: windows, linux, darwin
  --arch ARCH       指定目标架构,如: amd64, arm64, 386
  --output OUTPUT   指定输出文件路径
  --cgo_enabled     启用CGO,取值0或1,默认为0";

/// Whether cgo is enabled for the spawned toolchain (`CGO_ENABLED`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CgoEnabled {
    #[default]
    Disabled,
    Enabled,
}

impl CgoEnabled {
    /// Accepts exactly `"0"` or `"1"`.
    pub fn from_flag(value: &str) -> Option<Self> {
        match value {
            "0" => Some(CgoEnabled::Disabled),
            "1" => Some(CgoEnabled::Enabled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CgoEnabled::Disabled => "0",
            CgoEnabled::Enabled => "1",
        }
    }
}

/// Everything one invocation needs to know, built once by [`parse_arguments`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildConfig {
    /// Add `-gcflags=all="-N -l"`.
    pub debug: bool,
    /// `go install` instead of `go build`.
    pub install: bool,
    pub software_version: String,
    /// Suffix of the module path the linker symbols live under.
    pub app_name: String,
    /// `None` means "ask the host toolchain".
    pub target_os: Option<String>,
    pub target_arch: Option<String>,
    /// Only honoured in build mode.
    pub output_path: Option<String>,
    pub cgo_enabled: CgoEnabled,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            debug: false,
            install: false,
            software_version: DEFAULT_SOFTWARE_VERSION.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            target_os: None,
            target_arch: None,
            output_path: None,
            cgo_enabled: CgoEnabled::Disabled,
        }
    }
}

/// Result of a successful parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Run a build with this configuration.
    Build(BuildConfig),
    /// `-h` was given; print [`USAGE`] and do nothing else.
    Help,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("{flag} missing parameter")]
    MissingArgument { flag: String },

    #[error("{flag} value must be {expected}, got '{value}'")]
    InvalidValue {
        flag: String,
        value: String,
        expected: &'static str,
    },

    #[error("{0}")]
    Other(String),
}

/// Flags that stand alone.
const SWITCH_FLAGS: &[&str] = &["-h", "-d", "--debug", "-i", "--install"];

/// Flags that consume the next token as their value.
const VALUE_FLAGS: &[&str] = &[
    "-a",
    "--app",
    "-s",
    "--software",
    "--os",
    "--arch",
    "--output",
    "--cgo_enabled",
];

fn cli() -> Command {
    Command::new("go_build")
        .no_binary_name(true)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .args_override_self(true)
        .override_help(USAGE)
        .arg(Arg::new("help").short('h').action(ArgAction::Help))
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("install")
                .short('i')
                .long("install")
                .action(ArgAction::SetTrue),
        )
        .arg(value_arg("app", Some('a'), "app", "APPNAME"))
        .arg(value_arg("software", Some('s'), "software", "VER"))
        .arg(value_arg("os", None, "os", "OS"))
        .arg(value_arg("arch", None, "arch", "ARCH"))
        .arg(value_arg("output", None, "output", "OUTPUT"))
        .arg(value_arg("cgo_enabled", None, "cgo_enabled", "0/1"))
}

/// An option taking exactly one value. The value is the next token verbatim,
/// even when it starts with `-`.
fn value_arg(id: &'static str, short: Option<char>, long: &'static str, value_name: &'static str) -> Arg {
    let arg = Arg::new(id)
        .long(long)
        .value_name(value_name)
        .num_args(1)
        .allow_hyphen_values(true)
        .action(ArgAction::Set);
    match short {
        Some(c) => arg.short(c),
        None => arg,
    }
}

/// Drops every token that is neither a known flag nor the value of one.
///
/// Older callers still pass flags such as `--protocol http`; those are skipped
/// with a warning instead of failing the build.
fn retain_known_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut kept = Vec::new();
    let mut tokens = args.into_iter().map(|arg| -> OsString { arg.into() });
    while let Some(token) = tokens.next() {
        let text = token.to_string_lossy().into_owned();
        if SWITCH_FLAGS.contains(&text.as_str()) {
            kept.push(token);
        } else if VALUE_FLAGS.contains(&text.as_str()) {
            kept.push(token);
            // A missing value is left for clap to report.
            if let Some(value) = tokens.next() {
                kept.push(value);
            }
        } else if VALUE_FLAGS
            .iter()
            .any(|flag| flag.starts_with("--") && text.starts_with(&format!("{}=", flag)))
        {
            kept.push(token);
        } else {
            log::warn!("ignoring unrecognized argument '{}'", text);
        }
    }
    kept
}

/// Parses the arguments that follow the program name.
///
/// Unrecognized tokens are skipped.
///
/// # Errors
///
/// Fails on the first flag that is missing its value or carries an invalid
/// value. No subprocess has run at that point.
pub fn parse_arguments<I, T>(args: I) -> Result<ParseOutcome, ParseError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let matches = match cli().try_get_matches_from(retain_known_flags(args)) {
        Ok(matches) => matches,
        Err(err) => return translate_clap_error(&err),
    };

    let mut config = BuildConfig {
        debug: matches.get_flag("debug"),
        install: matches.get_flag("install"),
        target_os: matches.get_one::<String>("os").cloned(),
        target_arch: matches.get_one::<String>("arch").cloned(),
        output_path: matches.get_one::<String>("output").cloned(),
        ..BuildConfig::default()
    };
    if let Some(app) = matches.get_one::<String>("app") {
        config.app_name = app.clone();
    }
    if let Some(version) = matches.get_one::<String>("software") {
        config.software_version = version.clone();
    }
    if let Some(value) = matches.get_one::<String>("cgo_enabled") {
        config.cgo_enabled = CgoEnabled::from_flag(value).ok_or_else(|| ParseError::InvalidValue {
            flag: "--cgo_enabled".to_string(),
            value: value.clone(),
            expected: "0 or 1",
        })?;
    }

    Ok(ParseOutcome::Build(config))
}

fn translate_clap_error(err: &clap::Error) -> Result<ParseOutcome, ParseError> {
    match err.kind() {
        ErrorKind::DisplayHelp => Ok(ParseOutcome::Help),
        // Every option takes exactly one value of any shape, so clap can only
        // complain about a value when there was none.
        ErrorKind::InvalidValue | ErrorKind::TooFewValues => Err(ParseError::MissingArgument {
            flag: offending_flag(err),
        }),
        _ => Err(ParseError::Other(err.to_string().trim().to_string())),
    }
}

/// Pulls the flag name out of clap's context, e.g. `--app` from `--app <APPNAME>`.
fn offending_flag(err: &clap::Error) -> String {
    match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(arg)) => arg
            .split_whitespace()
            .next()
            .unwrap_or(arg.as_str())
            .to_string(),
        _ => "<unknown>".to_string(),
    }
}
