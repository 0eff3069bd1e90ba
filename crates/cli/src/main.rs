use std::process::ExitCode;

fn main() -> ExitCode {
    afterhours_cli::run()
}
