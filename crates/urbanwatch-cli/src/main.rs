//! `urbanwatch`: command-line client for the urbanwatch report store.
//!
//! All logic lives in the `urbanwatch` library; this binary only parses
//! arguments, calls the API and prints results. See `cli/mod.rs`.

mod cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
