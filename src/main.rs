//! corefstore CLI entry point
//!
//! Parses nothing and opens nothing itself: everything is delegated to
//! `cli::run`. Exits non-zero on failure.

use corefstore::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
