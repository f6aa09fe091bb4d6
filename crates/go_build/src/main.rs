// crates/go_build/src/main.rs

use std::env;
use std::process::ExitCode;

use go_build::logging;

fn main() -> ExitCode {
    logging::init_cli();

    match go_build::run(env::args_os().skip(1)) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
