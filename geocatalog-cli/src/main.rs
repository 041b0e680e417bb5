//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    if let Err(err) = geocatalog_cli::run() {
        eprintln!("geocatalog: {err}");
        std::process::exit(1);
    }
}
