fn main() {
    if let Err(e) = modula_cli::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
