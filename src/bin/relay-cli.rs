use std::collections::BTreeMap;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Command-line client for the HTTP relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8015")]
    url: String,

    /// Ask the relay to encrypt the request
    #[arg(long, global = true)]
    encrypt: bool,

    /// Header the relay reads the encryption toggle from
    #[arg(long, global = true, default_value = "x-encrypt-payload")]
    toggle_header: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check relay liveness
    Health,
    /// Forward a request through the relay
    Send {
        /// Target URL the relay should call
        #[arg(long = "url-target")]
        target: String,

        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Header as name:value (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Raw request body
        #[arg(short, long, conflicts_with = "json")]
        data: Option<String>,

        /// JSON request body
        #[arg(short, long)]
        json: Option<String>,

        /// Charset to try first when decoding the response
        #[arg(short, long)]
        encoding: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Send {
            target,
            method,
            params,
            headers,
            data,
            json,
            encoding,
        } => {
            let mut body = Map::new();
            body.insert("method".into(), json!(method));
            body.insert("url".into(), json!(target));
            body.insert("params".into(), json!(split_pairs(&params, '=')?));
            body.insert("headers".into(), json!(split_pairs(&headers, ':')?));
            if let Some(data) = data {
                body.insert("data".into(), json!(data));
            }
            if let Some(raw) = json {
                body.insert("json_data".into(), serde_json::from_str::<Value>(&raw)?);
            }
            if let Some(encoding) = encoding {
                body.insert("encoding".into(), json!(encoding));
            }

            let request_headers = toggle_headers(cli.encrypt, &cli.toggle_header)?;

            let res = client
                .post(format!("{}/mock/request", cli.url))
                .headers(request_headers)
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn split_pairs(items: &[String], sep: char) -> Result<BTreeMap<String, String>, String> {
    items
        .iter()
        .map(|item| {
            item.split_once(sep)
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .ok_or_else(|| format!("expected '{}' in '{}'", sep, item))
        })
        .collect()
}

/// Request headers carrying the encryption toggle, if enabled.
fn toggle_headers(encrypt: bool, name: &str) -> Result<HeaderMap, Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    if encrypt {
        headers.insert(HeaderName::from_bytes(name.as_bytes())?, HeaderValue::from_static("true"));
    }
    Ok(headers)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Err(format!("relay returned status {}", status).into());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
