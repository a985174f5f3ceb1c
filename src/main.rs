mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use medianode::config::Config;
use medianode::handlers::{NodeRegistry, ValueMap};
use medianode::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Serve(args) => {
            let address = args.address.unwrap_or(config.server.bind_addr);
            medianode::api::run(config, address).await?
        }
        Commands::Node(command) => {
            let inputs = command.inputs()?;
            let registry = NodeRegistry::from_config(&config)?;
            let envelope = registry
                .process(command.kind().as_str(), inputs, ValueMap::new())
                .await;

            println!("{}", serde_json::to_string_pretty(&envelope)?);
            if !envelope.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
