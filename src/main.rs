use tracing_subscriber::EnvFilter;

fn main() {
    // Logs go to stderr so stdout stays usable for `list` and `get`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("envredis=warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match envredis::cli::run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.exit_code());
        }
    }
}
