fn main() {
    if let Err(e) = everskies_lib::run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
