use std::time::Instant;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Management CLI for the unit stream relay", long_about = None)]
struct Cli {
    /// Admin API base URL
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, default_value = "admin-secret-key")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check relay status
    Status,
    /// List active streams per unit
    Streams,
    /// Open a unit stream and report the frames received
    Probe {
        unit_id: String,

        /// Relay WebSocket base URL
        #[arg(long, default_value = "ws://localhost:3000")]
        relay: String,

        /// Stop after this many frames
        #[arg(short, long, default_value_t = 10)]
        frames: usize,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Streams => {
            let res = client
                .get(format!("{}/admin/streams", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Probe {
            unit_id,
            relay,
            frames,
        } => probe(&relay, &unit_id, frames).await?,
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

async fn probe(relay: &str, unit_id: &str, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/ws/stream/{}", relay.trim_end_matches('/'), unit_id);
    let (mut ws, _) = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok(conn) => conn,
        Err(tokio_tungstenite::tungstenite::Error::Http(res)) => {
            eprintln!("Error: relay refused stream with status {}", res.status());
            if let Some(body) = res.body() {
                eprintln!("Response: {}", String::from_utf8_lossy(body).trim());
            }
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let started = Instant::now();
    let mut received = 0usize;
    let mut total_bytes = 0usize;

    while received < limit {
        match ws.next().await {
            Some(Ok(Message::Binary(frame))) => {
                received += 1;
                total_bytes += frame.len();
                let well_formed = frame.starts_with(&[0xFF, 0xD8]) && frame.ends_with(&[0xFF, 0xD9]);
                println!(
                    "frame {:>4}: {:>8} bytes{}",
                    received,
                    frame.len(),
                    if well_formed { "" } else { "  (missing JPEG markers)" }
                );
            }
            Some(Ok(Message::Text(text))) => {
                eprintln!("Relay: {}", text.as_str());
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }

    let elapsed = started.elapsed().as_secs_f64();
    println!(
        "{} frames, {} bytes in {:.2}s ({:.1} fps)",
        received,
        total_bytes,
        elapsed,
        if elapsed > 0.0 { received as f64 / elapsed } else { 0.0 }
    );

    let _ = ws.close(None).await;
    Ok(())
}
