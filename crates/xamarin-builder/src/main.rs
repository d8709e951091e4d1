fn main() {
    if let Err(err) = xamarin_builder::run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
