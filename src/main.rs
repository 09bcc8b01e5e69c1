//! Binary entrypoint for the Vecho chat server.

use std::process::ExitCode;

use vecho::start_vecho;

/// Start the server with configuration from the environment.
fn main() -> ExitCode {
    start_vecho::run()
}
