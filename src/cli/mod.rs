//! Command-line interface
//!
//! One operation per invocation against the data directory named in the
//! config file. Output is a single JSON envelope on stdout.

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{execute, init, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_envelope, read_json_file, success_envelope, write_error, write_response};
