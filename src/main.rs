fn main() {
    #[cfg(feature = "cli")]
    oxilzo::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("oxilzo: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
