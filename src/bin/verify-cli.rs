use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "verify-cli")]
#[command(about = "Client CLI for the number verification service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Sent as X-API-Key; also selects the caller's rate limit bucket.
    #[arg(short, long, env = "VERIFY_API_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a phone number, plain or SHA-256 hashed
    Verify {
        #[arg(long, conflicts_with = "hash", required_unless_present = "hash")]
        number: Option<String>,
        #[arg(long)]
        hash: Option<String>,
        #[arg(long)]
        correlation_id: Option<String>,
    },
    /// Retrieve the subscriber's phone number
    DeviceNumber,
    /// Show service health and circuit breaker states
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert("x-api-key", HeaderValue::from_str(key)?);
    }

    let res = match cli.command {
        Commands::Verify {
            number,
            hash,
            correlation_id,
        } => {
            let body = json!({
                "phoneNumber": number,
                "hashedPhoneNumber": hash,
                "correlationId": correlation_id,
            });
            client
                .post(format!("{}/api/v1/verify", cli.url))
                .headers(headers)
                .json(&body)
                .send()
                .await?
        }
        Commands::DeviceNumber => {
            client
                .get(format!("{}/api/v1/device-phone-number", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Health => client.get(format!("{}/health", cli.url)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{rendered}");
    } else {
        eprintln!("Error: service returned status {status}");
        eprintln!("{rendered}");
    }
    Ok(())
}
