use clap::{Parser, Subcommand};
use reqwest::redirect::Policy;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "health-cli")]
#[command(about = "Operator CLI for the failover health toggle", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current health report
    Status,
    /// Mark this instance unhealthy for the configured window
    Unhealthy,
    /// Clear any unhealthy window
    Healthy,
    /// Show region and storage details of the instance
    Info,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder().redirect(Policy::none()).build()?;
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Status => {
            let res = client.get(format!("{base}/health")).send().await?;
            print_response(res).await?;
        }
        Commands::Unhealthy => toggle(&client, base, "make_unhealthy").await?,
        Commands::Healthy => toggle(&client, base, "make_healthy").await?,
        Commands::Info => {
            let res = client.get(format!("{base}/info")).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn toggle(client: &reqwest::Client, base: &str, action: &str) -> Result<(), Box<dyn std::error::Error>> {
    let res = client
        .post(format!("{base}/health/control"))
        .form(&[("action", action)])
        .send()
        .await?;

    let flash = res
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|location| url::Url::parse(base).ok()?.join(location).ok())
        .and_then(|url| {
            let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
            Some((pairs.get("category")?.clone(), pairs.get("message")?.clone()))
        });

    match flash {
        Some((category, message)) if category == "success" => println!("{message}"),
        Some((_, message)) => eprintln!("Error: {message}"),
        None => eprintln!("Error: unexpected response status {}", res.status()),
    }
    Ok(())
}

/// Print a JSON body. A 503 from `/health` still carries the report.
async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => {
            if !status.is_success() {
                eprintln!("Status: {status}");
            }
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Err(_) => {
            eprintln!("Error: server returned status {status}");
            eprintln!("Response: {text}");
        }
    }
    Ok(())
}
