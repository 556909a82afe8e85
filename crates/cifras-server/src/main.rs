//! cifras-server binary.
//!
//! Serves the JSON API by default. Two maintenance modes run instead of the
//! server and exit:
//!
//! - `--hash-password` reads a password from stdin and prints the argon2 PHC
//!   string to put in `admin_password_hash`;
//! - `--recompute-implicit` rebuilds the implicit-inflation series from the
//!   nominal and real curves and prints the per-tenor report as JSON.

use std::{
  io::{self, BufRead, Write},
  net::SocketAddr,
  path::PathBuf,
  sync::Arc,
};

use anyhow::Context as _;
use cifras_analytics::{Reader, implicit};
use cifras_api::ApiState;
use cifras_server::{AppState, ServerConfig, auth};
use cifras_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Cifras macro-financial API server")]
struct Cli {
  /// TOML configuration file; `CIFRAS_*` variables override its keys.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password read from stdin and exit.
  #[arg(long, conflicts_with = "recompute_implicit")]
  hash_password: bool,

  /// Recompute the implicit-inflation series, print the report and exit.
  #[arg(long)]
  recompute_implicit: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  if cli.hash_password {
    return print_password_hash();
  }

  let cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("invalid configuration in {:?}", cli.config))?;
  let store_path = cfg.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if cli.recompute_implicit {
    let report = implicit::recompute(Reader::new(&store), cfg.analytics.home_country)
      .await
      .context("implicit-inflation recompute failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  serve(cfg, store).await
}

async fn serve(cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  if cfg.admin_password_hash.is_empty() {
    warn!("admin_password_hash is empty; admin login is disabled");
  }
  if cfg.production {
    info!("production mode: admin endpoints answer 403");
  }

  let state = AppState {
    api:  ApiState::new(Arc::new(store), Arc::new(cfg.analytics.clone())),
    gate: cfg.admin_gate(),
  };
  let address = cfg.address();
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  info!(%address, "cifras listening");

  let app = cifras_server::router(state);
  axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
    .await
    .context("server error")
}

fn print_password_hash() -> anyhow::Result<()> {
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\n', '\r']);
  let hash = auth::hash_password(password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
  println!("{hash}");
  Ok(())
}
