//! Membership Bot - Telegram front-end for member registration
//!
//! Architecture:
//! - JSON data file owned by a single store worker
//! - Teloxide for the registration dialogue and admin commands
//! - Axum for the verification API with rate limiting
//! - Tokio for async runtime

mod entity;
mod error;
mod plugins;
mod prelude;
mod session;
mod state;
mod store;
mod sv;
mod text;
mod utils;

use std::{env, sync::Arc};

use teloxide::Bot;
use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  plugins::{App, cron, server, telegram},
  prelude::*,
  state::{AppState, Config},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  // Initialize tracing
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "membership=debug,tower_http=debug,teloxide=info".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  // Load configuration from environment
  let token = env::var("TELOXIDE_TOKEN").context("TELOXIDE_TOKEN not set")?;
  let config = Config::from_env()?;

  info!("Starting Membership Bot v{}", env!("CARGO_PKG_VERSION"));
  info!("Data file: {}", config.data_file.display());

  let app = Arc::new(AppState::new(Bot::new(token), config));

  let mut services =
    App::new().register(telegram::Plugin).register(cron::Plugin);
  if app.config.secret.is_some() {
    services = services.register(server::Plugin);
  } else {
    warn!("SERVER_SECRET not set, HTTP API disabled");
  }
  info!("Running {} services", services.len());

  let handles = services.run(app);

  tokio::signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;
  info!("Shutting down...");
  for handle in handles {
    handle.abort();
  }

  Ok(())
}
