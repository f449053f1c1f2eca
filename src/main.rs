//! testgen - Command-line tool for generating canvas conformance tests

use std::process::ExitCode;

use testgen::cli;

fn main() -> ExitCode {
    cli::run()
}
