use std::process::ExitCode;

fn main() -> ExitCode {
    tillpoint_cli::run()
}
