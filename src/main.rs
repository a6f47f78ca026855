use std::process::ExitCode;

fn main() -> ExitCode {
    folio::run()
}
