// crates/go_build/src/lib.rs

use std::ffi::OsString;

use anyhow::{Context, Result};
use build_command::{compose_command, BuildCommand};
use build_options::{parse_arguments, ParseOutcome, USAGE};
use git_metadata::GitCli;
use go_env::{resolve_go_env, GoToolchain, HostShell};
use ldflags::collect_build_info;

pub mod logging;

/// Exit code for a successful build or a help request.
pub const EXIT_OK: u8 = 0;
/// Exit code when the go subprocess fails.
pub const EXIT_BUILD_FAILED: u8 = 1;

/// Runs the composed command and reports the result on stdout.
///
/// The full command line is echoed either way so it can be re-run by hand.
pub fn execute(command: &BuildCommand) -> u8 {
    match command.run() {
        Ok(()) => {
            println!("build ok: {}", command);
            EXIT_OK
        }
        Err(err) => {
            tracing::error!("{}", err);
            println!("build failed: {}", command);
            EXIT_BUILD_FAILED
        }
    }
}

/// Parses `args`, gathers env and version metadata, and runs the build.
///
/// # Errors
///
/// Returns an error only for bad arguments; nothing has been spawned then.
/// A failed build is not an error here, it is [`EXIT_BUILD_FAILED`].
pub fn run<I, T>(args: I) -> Result<u8>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config = match parse_arguments(args).context("invalid arguments")? {
        ParseOutcome::Help => {
            println!("{}", USAGE);
            return Ok(EXIT_OK);
        }
        ParseOutcome::Build(config) => config,
    };
    tracing::debug!(?config, "parsed build options");

    let shell = HostShell::current();
    let env = resolve_go_env(&config, &GoToolchain::default());
    let info = collect_build_info(&config, &GitCli::default(), chrono::Local::now().naive_local());
    let command = compose_command(&config, env, shell, &info);
    tracing::info!(command = %command, "composed go command");

    Ok(execute(&command))
}
