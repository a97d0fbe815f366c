#![forbid(unsafe_code)]
//! MedChain command line client. Talks to a running node over HTTP.

use clap::{Parser, Subcommand};
use colored::*;
use medchain::network::{parse_peer_address, ChainResponse};
use medchain::transaction::Transaction;
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "medchain", version, about = "MedChain client")]
struct Cli {
    /// Node to talk to
    #[arg(short, long, default_value = "http://127.0.0.1:5000")]
    node: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the node's full chain
    Chain,
    /// Ask the node to mine its pending transactions into a block
    Mine,
    /// Submit a medical record transaction
    Submit {
        #[arg(long)]
        patient: String,
        #[arg(long)]
        illness: String,
        #[arg(long, default_value = "")]
        tests: String,
        #[arg(long)]
        amount: i64,
    },
    /// Register one or more peers with the node
    Register {
        #[arg(required = true)]
        peers: Vec<String>,
    },
    /// Run a consensus round on the node
    Resolve,
    /// List sealed records for a patient
    Records { patient: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "error:".bright_red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let base = format!("http://{}", parse_peer_address(&cli.node)?);
    let client = reqwest::Client::new();

    match cli.command {
        Command::Chain => {
            let response: ChainResponse = client
                .get(format!("{}/chain", base))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{} {}", "Chain length:".bright_cyan().bold(), response.length);
            for block in &response.chain {
                println!(
                    "  #{} proof={} txs={} prev={}",
                    block.index.to_string().bright_white(),
                    block.proof,
                    block.transactions.len(),
                    short_hash(&block.previous_hash).dimmed()
                );
            }
        }
        Command::Mine => {
            let body = get_json(&client, format!("{}/mine", base)).await?;
            println!("{}", "New block forged".bright_green().bold());
            print_json(&body)?;
        }
        Command::Submit {
            patient,
            illness,
            tests,
            amount,
        } => {
            let tx = Transaction::new(patient, illness, tests, amount);
            let body: Value = client
                .post(format!("{}/transactions/new", base))
                .json(&tx)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", body["message"].as_str().unwrap_or_default().bright_green());
        }
        Command::Register { peers } => {
            let response = client
                .post(format!("{}/nodes/register", base))
                .json(&serde_json::json!({ "nodes": peers }))
                .send()
                .await?;
            let status = response.status();
            let body: Value = response.json().await?;
            if !status.is_success() {
                return Err(body["error"].as_str().unwrap_or("registration failed").into());
            }
            println!("{}", "Known peers:".bright_cyan().bold());
            for peer in body["total_nodes"].as_array().into_iter().flatten() {
                println!("  - {}", peer.as_str().unwrap_or_default());
            }
        }
        Command::Resolve => {
            let body = get_json(&client, format!("{}/nodes/resolve", base)).await?;
            let message = body["message"].as_str().unwrap_or_default();
            if body["replaced"].as_bool().unwrap_or(false) {
                println!("{}", message.bright_yellow().bold());
            } else {
                println!("{}", message.bright_green().bold());
            }
        }
        Command::Records { patient } => {
            let body = get_json(&client, format!("{}/patients/{}/records", base, patient)).await?;
            print_json(&body)?;
        }
    }

    Ok(())
}

async fn get_json(client: &reqwest::Client, url: String) -> Result<Value, reqwest::Error> {
    client.get(url).send().await?.error_for_status()?.json().await
}

fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Abbreviate a hex digest. Peers can send any string as a link, so
/// anything that would not split on a char boundary is shown whole.
fn short_hash(hash: &str) -> String {
    if hash.len() <= 16 {
        return hash.to_string();
    }
    match (hash.get(..8), hash.get(hash.len() - 8..)) {
        (Some(head), Some(tail)) => format!("{}...{}", head, tail),
        _ => hash.to_string(),
    }
}
