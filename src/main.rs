fn main() {
    if let Err(err) = erp_normalize::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
