use std::process::ExitCode;

fn main() -> ExitCode {
    envforge_cli::run()
}
