//! skein CLI binary: run the tool loop, the ReAct agent or one of the workflows.

use clap::Parser;
use skein_cli::{logging, run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = skein_config::load_and_apply("skein", None) {
        eprintln!("warning: config not loaded: {}", e);
    }
    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("warning: logging not initialized: {}", e);
    }
    match run(cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }
}
