fn main() {
    std::process::exit(usc::cli::run(std::env::args_os()));
}
