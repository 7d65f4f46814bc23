// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Daemon, Files, Health, Restore, Version, Versions, Watch};

command_enum! {
    (Daemon, Daemon),
    (Files, Files),
    (Health, Health),
    (Restore, Restore),
    (Version, Version),
    (Versions, Versions),
    (Watch, Watch),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Resolve remote URL: explicit flag > hardcoded default port
    let remote = cli::op::resolve_remote(args.remote);

    // Build context - always has API client initialized
    let ctx = match cli::op::OpContext::new(remote) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
