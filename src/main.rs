use std::process::ExitCode;

fn main() -> ExitCode {
    qfasttools::logger::init();
    qfasttools::cli::main_entry()
}
