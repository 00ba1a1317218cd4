use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use storefront::config::load_config;
use storefront::health::report::{HealthResponse, HealthStatus};

#[derive(Parser)]
#[command(name = "storefront-cli")]
#[command(about = "Operations CLI for the storefront", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the dependency health report
    Health {
        #[arg(long, default_value = "/health")]
        path: String,
    },
    /// Load and validate a configuration file
    Validate { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Health { path } => {
            let url = format!("{}{}", cli.url.trim_end_matches('/'), path);
            let res = reqwest::Client::new().get(&url).send().await?;
            let status = res.status();
            if !status.is_success() {
                eprintln!("Error: health endpoint returned status {}", status);
                return Ok(ExitCode::FAILURE);
            }

            let report: HealthResponse = res.json().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.status == HealthStatus::Healthy {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Validate { path } => match load_config(&path) {
            Ok(config) => {
                println!("{} is valid", path.display());
                println!("  environment: {:?}", config.environment);
                println!("  products:    {}", config.application_settings.products_api_endpoint);
                println!("  orders:      {}", config.application_settings.orders_api_endpoint);
                println!("  policy:      {:?}", config.resilience.policy);
                println!(
                    "  telemetry:   {}",
                    if config.application_settings.telemetry_key().is_some() { "enabled" } else { "disabled" }
                );
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                Ok(ExitCode::FAILURE)
            }
        },
    }
}
