use std::path::PathBuf;
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "dispatch-cli")]
#[command(about = "Operator CLI for the authority dispatch service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "DISPATCH_URL")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a document from a JSON file
    Submit {
        /// File holding `{jurisdiction, issuer_id, notification_url?, payload}`
        file: PathBuf,
    },
    /// Show a record
    Status { id: String },
    /// Queue a record for processing again
    Reprocess { id: String },
    /// Service and circuit breaker health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Submit { file } => {
            let body: Value = serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            let res = client
                .post(format!("{base}/documents"))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Status { id } => {
            let res = client.get(format!("{base}/documents/{id}")).send().await?;
            print_response(res).await?;
        }
        Commands::Reprocess { id } => {
            let res = client
                .post(format!("{base}/documents/{id}/reprocess"))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{base}/health")).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: dispatch API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
