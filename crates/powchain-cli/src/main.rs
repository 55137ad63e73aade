use anyhow::Result;
use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "powchain-cli")]
#[command(about = "CLI client for the proof-of-work ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:5000)
    #[arg(long, global = true, default_value = "http://127.0.0.1:5000")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Queue a transaction for the next block
    Submit {
        #[arg(long)]
        sender: String,
        #[arg(long)]
        recipient: String,
        #[arg(long, allow_negative_numbers = true)]
        amount: f64,
    },
    /// Mine a block with the pending transactions
    Mine,
    /// Print the full chain
    Chain,
    /// Print transactions waiting for the next block
    Pending,
    /// Register peer nodes
    Register {
        /// Peer URLs, e.g. http://127.0.0.1:5001
        #[arg(required = true)]
        nodes: Vec<String>,
    },
    /// Ask the node to adopt the longest valid chain among its peers
    Resolve,
}

#[derive(Serialize)]
struct Tx {
    sender: String,
    recipient: String,
    amount: f64,
}

#[derive(Serialize)]
struct Nodes {
    nodes: Vec<String>,
}

impl Command {
    fn request(self, client: &Client, node: &str) -> RequestBuilder {
        match self {
            Command::Submit {
                sender,
                recipient,
                amount,
            } => client
                .post(format!("{node}/transactions/add"))
                .json(&Tx {
                    sender,
                    recipient,
                    amount,
                }),
            Command::Mine => client.get(format!("{node}/mining")),
            Command::Chain => client.get(format!("{node}/fullchain")),
            Command::Pending => client.get(format!("{node}/transactions/pending")),
            Command::Register { nodes } => client
                .post(format!("{node}/nodes/register"))
                .json(&Nodes { nodes }),
            Command::Resolve => client.get(format!("{node}/nodes/conflict_resolving")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/').to_string();
    let client = Client::new();
    debug!(cmd = ?cli.cmd, node = %node, "sending request");

    let res = cli.cmd.request(&client, &node).send().await?;
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}
