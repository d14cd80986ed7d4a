fn main() {
    pagegrab::cli::run();
}
