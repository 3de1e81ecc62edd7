use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "resi-cli")]
#[command(about = "Command-line client for the resi-tracker service", long_about = None)]
struct Cli {
    #[arg(short, long, env = "RESI_TRACKER_URL", default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a shipment's tracking history
    Track {
        /// Tracking number
        #[arg(short, long)]
        resi: String,
        /// Courier identifier (e.g. jne, jnt, sicepat)
        #[arg(short, long)]
        courier: String,
    },
    /// Show breaker and admission state
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Track { resi, courier } => {
            client
                .get(format!("{base}/track"))
                .query(&[("resi", resi.as_str()), ("courier", courier.as_str())])
                .send()
                .await?
        }
        Commands::Health => client.get(format!("{base}/health")).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let retry_after = res
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Some(secs) = retry_after {
            eprintln!("Retry after: {}s", secs);
        }
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
