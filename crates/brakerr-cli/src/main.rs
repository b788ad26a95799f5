mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    // Logging is initialized inside once the level flags are parsed.
    if let Err(err) = Cli::run_from_args().await {
        eprintln!("brakerr error: {:#}", err);
        std::process::exit(1);
    }
}
