// Path: crates/meridian-node/src/bin/meridian-node.rs
//! `meridian-node`: daemon entrypoint, key management, and offline signing.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use meridian_crypto::sign::{generate_keypair, sign_hash};
use meridian_elections::StaticWeightTable;
use meridian_ledger::Ledger;
use meridian_node::{Node, RewardIdentity};
use meridian_types::config::Config;
use meridian_types::primitives::{Account, Hash};
use meridian_types::KeyPair;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Parser, Debug)]
#[command(name = "meridian-node", version, about = "Account-chain DPoS node daemon and key tooling")]
struct Cli {
    /// Run as a long-lived daemon.
    #[arg(long)]
    daemon: bool,
    /// Path to this node's own key file, used for the daemon's reward-sweep identity.
    #[arg(long)]
    key: Option<PathBuf>,
    /// Ledger data directory (overrides the config file's `data_path`).
    #[arg(long)]
    data_path: Option<PathBuf>,
    /// Path to an optional JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Generate a new keypair and write it to `--file`.
    #[arg(long)]
    key_create: bool,
    /// Target file for `--key_create`.
    #[arg(long)]
    file: Option<PathBuf>,
    /// Sign `--hash` with `--key` and print the signature, without starting a node.
    #[arg(long)]
    sign: bool,
    /// A 32-byte hash, hex-encoded, for `--sign`.
    #[arg(long)]
    hash: Option<String>,
}

/// On-disk key file: hex-encoded account and secret.
#[derive(Serialize, Deserialize)]
struct KeyFile {
    account: String,
    secret: String,
}

impl KeyFile {
    fn from_keypair(keypair: &KeyPair) -> Self {
        KeyFile {
            account: hex::encode(keypair.account.0),
            secret: hex::encode(keypair.secret),
        }
    }

    fn into_keypair(self) -> Result<KeyPair> {
        let account = decode_32(&self.account).context("key file account field")?;
        let secret = decode_32(&self.secret).context("key file secret field")?;
        Ok(KeyPair::from_raw(account, secret))
    }
}

fn decode_32(hex_str: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_str)?;
    bytes
        .try_into()
        .map_err(|_| anyhow!("expected 32 bytes, got a different length"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => Ok(()),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    if cli.key_create {
        return key_create(cli.file.as_deref());
    }
    if cli.sign {
        return sign(cli.key.as_deref(), cli.hash.as_deref());
    }
    if cli.daemon {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("building tokio runtime")?;
        return runtime.block_on(daemon(cli));
    }
    Err(anyhow!("no action requested; pass --daemon, --key_create, or --sign"))
}

fn key_create(file: Option<&Path>) -> Result<()> {
    let file = file.ok_or_else(|| anyhow!("--key_create requires --file"))?;
    let keypair = generate_keypair();
    let key_file = KeyFile::from_keypair(&keypair);
    let json = serde_json::to_string_pretty(&key_file)?;
    std::fs::write(file, json).with_context(|| format!("writing key file {}", file.display()))?;
    println!("{}", hex::encode(keypair.account.0));
    Ok(())
}

fn sign(key: Option<&Path>, hash_hex: Option<&str>) -> Result<()> {
    let key = key.ok_or_else(|| anyhow!("--sign requires --key"))?;
    let hash_hex = hash_hex.ok_or_else(|| anyhow!("--sign requires --hash"))?;
    let keypair = load_key(key)?;
    let hash = Hash(decode_32(hash_hex)?);
    let signature = sign_hash(&keypair, &hash)?;
    println!("{}", hex::encode(signature.0));
    Ok(())
}

fn load_key(path: &Path) -> Result<KeyPair> {
    let data = std::fs::read_to_string(path).with_context(|| format!("reading key file {}", path.display()))?;
    let key_file: KeyFile = serde_json::from_str(&data)?;
    key_file.into_keypair()
}

struct AppState {
    node: Mutex<Node>,
    ledger: Ledger,
    started_at: Instant,
}

async fn daemon(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            let data = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
            Config::from_json(&data)?
        }
        None => Config::default(),
    };

    meridian_node::init_tracing(&config.log);

    let data_path = cli.data_path.clone().unwrap_or_else(|| PathBuf::from(&config.data_path));
    let ledger = Ledger::open(&data_path).with_context(|| format!("opening ledger at {}", data_path.display()))?;

    let reward_identity = cli
        .key
        .as_deref()
        .map(load_key)
        .transpose()?
        .map(|keypair| RewardIdentity {
            account: keypair.account,
            secret: keypair.secret,
            fan_width: 3,
            forward_reward_to: config
                .forward_reward_to
                .as_deref()
                .and_then(|hex_str| decode_32(hex_str).ok())
                .map(Account),
            daily_forward_times: config.daily_forward_times,
        });

    let node = Node::new(ledger.clone(), reward_identity);
    let state = Arc::new(AppState {
        node: Mutex::new(node),
        ledger: ledger.clone(),
        started_at: Instant::now(),
    });

    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.port + 1));
    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind(metrics_addr)
        .await
        .with_context(|| format!("binding operational HTTP surface on {metrics_addr}"))?;
    let http_handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let pump_state = state.clone();
    let pump_handle = tokio::spawn(async move {
        let weights = StaticWeightTable::default();
        loop {
            let mut node = pump_state.node.lock().await;
            let utc_day = unix_now() / 86_400;
            node.tick(&pump_state.ledger, &weights, Instant::now(), utc_day);
            drop(node);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });

    tracing::info!(data_path = %data_path.display(), %metrics_addr, "meridian-node daemon started");
    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    tracing::info!("shutdown requested, stopping subsystems leaf-first");

    // Leaf-first per the documented stop order: app framework -> rewarder ->
    // syncer -> elections -> queries -> processor -> peers -> network -> ledger.
    // Without a real network transport wired up yet there's nothing live below
    // the processor; dropping the tasks and the ledger handle covers the rest.
    pump_handle.abort();
    http_handle.abort();
    drop(state);
    drop(ledger);
    Ok(())
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(state): State<Arc<AppState>>) -> &'static str {
    if state.ledger.begin_read().is_ok() {
        "ready"
    } else {
        "not ready"
    }
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    format!("meridian_node_uptime_seconds {}\n", state.started_at.elapsed().as_secs())
}
