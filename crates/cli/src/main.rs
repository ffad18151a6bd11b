//! Waitline CLI - staff and customer commands against a running daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9627";

#[derive(Parser)]
#[command(name = "waitline")]
#[command(about = "Waitline queue CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "WAITLINE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a business's queue
    Join {
        business_id: String,

        /// Customer name
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Number of people in the party
        #[arg(short, long)]
        party_size: Option<u32>,
    },

    /// Show one queue entry
    Status { queue_id: String },

    /// Call a waiting customer to the counter
    Call { queue_id: String },

    /// Mark a customer as served
    Serve { queue_id: String },

    /// Cancel a queue entry
    Cancel { queue_id: String },

    /// Close gaps in waiting positions
    Recalc { business_id: String },

    /// Show the staff board for a business
    Board { business_id: String },

    /// Show or set the congestion level (low, moderate, high)
    Congestion {
        business_id: String,
        level: Option<String>,
    },

    /// Open or close a business
    Open {
        business_id: String,
        #[arg(action = clap::ArgAction::Set)]
        is_open: bool,
    },

    /// Current queue length and estimated wait
    WaitTime { business_id: String },

    /// Daemon health
    Health,
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize)]
struct Entry {
    id: String,
    position: u32,
    estimated_wait_time: u32,
    status: String,
    user_info: UserInfo,
    ml_predicted: bool,
}

#[derive(Deserialize)]
struct UserInfo {
    name: String,
    party_size: Option<u32>,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "#")]
    position: u32,
    id: String,
    name: String,
    party: String,
    #[tabled(rename = "wait (min)")]
    wait: String,
    status: String,
}

impl From<Entry> for EntryRow {
    fn from(entry: Entry) -> Self {
        Self {
            position: entry.position,
            id: entry.id,
            name: entry.user_info.name,
            party: entry
                .user_info
                .party_size
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
            wait: if entry.ml_predicted {
                format!("{} (ml)", entry.estimated_wait_time)
            } else {
                entry.estimated_wait_time.to_string()
            },
            status: entry.status,
        }
    }
}

async fn call_rpc(url: &str, method: &str, params: Value) -> Result<Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0",
        method,
        params,
        id: 1,
    };

    let response: JsonRpcResponse = reqwest::Client::new()
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn entry_table(entries: Vec<Entry>) -> String {
    Table::new(entries.into_iter().map(EntryRow::from)).to_string()
}

fn print_section(title: &str, entries: Vec<Entry>) {
    println!("{} ({})", title.cyan().bold(), entries.len());
    if !entries.is_empty() {
        println!("{}", entry_table(entries));
    }
    println!();
}

async fn transition(url: &str, method: &str, queue_id: String, verb: &str) -> Result<()> {
    let result = call_rpc(url, method, json!({ "queue_id": queue_id })).await?;
    println!(
        "{}",
        format!("✓ {} {} (now {})", verb, queue_id, result["status"].as_str().unwrap_or("?"))
            .green()
            .bold()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let url = cli.rpc_url.as_str();

    match cli.command {
        Commands::Join {
            business_id,
            name,
            phone,
            email,
            party_size,
        } => {
            let params = json!({
                "business_id": business_id,
                "user_info": {
                    "name": name,
                    "phone": phone,
                    "email": email,
                    "party_size": party_size,
                },
            });

            let result = call_rpc(url, "queue.join.v1", params).await?;
            let entry: Entry = serde_json::from_value(result["entry"].clone())?;

            println!("{}", "✓ Joined the queue".green().bold());
            println!();
            println!("{}", entry_table(vec![entry]));
        }

        Commands::Status { queue_id } => {
            let result = call_rpc(url, "queue.status.v1", json!({ "queue_id": queue_id })).await?;
            let entry: Entry = serde_json::from_value(result)?;
            println!("{}", entry_table(vec![entry]));
        }

        Commands::Call { queue_id } => transition(url, "queue.call.v1", queue_id, "Called").await?,
        Commands::Serve { queue_id } => transition(url, "queue.serve.v1", queue_id, "Served").await?,
        Commands::Cancel { queue_id } => {
            transition(url, "queue.cancel.v1", queue_id, "Cancelled").await?
        }

        Commands::Recalc { business_id } => {
            let result = call_rpc(
                url,
                "queue.recalculate.v1",
                json!({ "business_id": business_id }),
            )
            .await?;
            println!(
                "{}",
                format!("✓ {} entries repositioned", result["updated_count"])
                    .green()
                    .bold()
            );
        }

        Commands::Board { business_id } => {
            let board = call_rpc(url, "queue.board.v1", json!({ "business_id": business_id })).await?;
            let business = &board["business"];

            println!(
                "{} {}",
                business["name"].as_str().unwrap_or(&business_id).bold(),
                if business["is_open"].as_bool().unwrap_or(false) {
                    "OPEN".green()
                } else {
                    "CLOSED".red()
                }
            );
            println!(
                "  {} {}   {} {} min   {} {}   {} {}",
                "Waiting:".bold(),
                board["queue_length"],
                "Est. wait:".bold(),
                board["estimated_wait_time"],
                "Served:".bold(),
                board["total_served"],
                "Congestion:".bold(),
                business["congestion_level"].as_str().unwrap_or("low"),
            );
            println!();

            for (title, key) in [
                ("Waiting", "waiting"),
                ("Recently called", "called"),
                ("Recently served", "served"),
            ] {
                let entries: Vec<Entry> = serde_json::from_value(board[key].clone())?;
                print_section(title, entries);
            }
        }

        Commands::Congestion { business_id, level } => {
            let result = match level {
                Some(level) => {
                    call_rpc(
                        url,
                        "business.congestion.set.v1",
                        json!({ "business_id": business_id, "level": level }),
                    )
                    .await?
                }
                None => {
                    call_rpc(
                        url,
                        "business.congestion.get.v1",
                        json!({ "business_id": business_id }),
                    )
                    .await?
                }
            };

            let level = result["level"].as_str().unwrap_or("low");
            let colored = match level {
                "high" => level.red(),
                "moderate" => level.yellow(),
                _ => level.green(),
            };
            println!("  {} {}", "Congestion:".bold(), colored.bold());
        }

        Commands::Open {
            business_id,
            is_open,
        } => {
            call_rpc(
                url,
                "business.open.set.v1",
                json!({ "business_id": business_id, "is_open": is_open }),
            )
            .await?;
            let state = if is_open { "open" } else { "closed" };
            println!("{}", format!("✓ {} is now {}", business_id, state).green().bold());
        }

        Commands::WaitTime { business_id } => {
            let result = call_rpc(
                url,
                "business.wait_time.v1",
                json!({ "business_id": business_id }),
            )
            .await?;
            println!("  {} {}", "Waiting:".bold(), result["queue_length"]);
            println!("  {} {} min", "Est. wait:".bold(), result["estimated_wait_time"]);
        }

        Commands::Health => {
            println!("{}", "Daemon Health".cyan().bold());
            println!();

            match call_rpc(url, "admin.health.v1", json!({})).await {
                Ok(health) => {
                    let status = health["status"].as_str().unwrap_or("unknown");
                    println!("  {} {}", "RPC URL:".bold(), url);
                    println!(
                        "  {} {}",
                        "Status:".bold(),
                        if status == "ok" {
                            status.to_uppercase().green()
                        } else {
                            status.to_uppercase().yellow()
                        }
                    );
                    println!("  {} {}", "Store:".bold(), health["store"]);
                    println!(
                        "  {} {}",
                        "Prediction:".bold(),
                        if health["prediction_available"].as_bool().unwrap_or(false) {
                            "available".green()
                        } else {
                            "unavailable (fallback estimates)".yellow()
                        }
                    );
                    println!("  {} {} seconds", "Uptime:".bold(), health["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "OFFLINE".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }
    }

    Ok(())
}
