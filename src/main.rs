use clap::Parser;

use fire_plan::api::{Cli, run_cli};

#[tokio::main]
async fn main() {
    fire_plan::logging::init_logging();

    let cli = Cli::parse();
    if let Err(e) = run_cli(cli).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
