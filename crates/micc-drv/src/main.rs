fn main() {
    let args = std::env::args().skip(1);

    if let Err(error) = micc_drv::run(args) {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}
