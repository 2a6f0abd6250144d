//! Binary entrypoint for the gentask tool

#[tokio::main]
async fn main() {
    if let Err(err) = gentask::cli::run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
