//! nodeforge binary entry point
//!
//! All logic lives in the library; the exit code is the command's.

use nodeforge::cli;

fn main() {
    std::process::exit(cli::run());
}
