use std::process::ExitCode;

fn main() -> ExitCode {
    cohort_cli::run()
}
