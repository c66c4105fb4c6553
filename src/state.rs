use std::{
  collections::{HashSet, hash_map::DefaultHasher},
  env,
  hash::{Hash, Hasher},
  path::PathBuf,
  sync::atomic::{AtomicU64, Ordering},
};

use futures::future;
use teloxide::{
  Bot,
  prelude::*,
  types::{InputFile, ParseMode},
};
use tokio::fs;

use crate::{entity::user, prelude::*, session::Sessions, store::Store, sv};

#[derive(Debug, Clone)]
pub struct Config {
  pub data_file: PathBuf,
  pub admins: HashSet<i64>,
  /// Bearer secret of the HTTP API, which stays off without it
  pub secret: Option<String>,
  pub port: u16,
  pub renewal_days: u32,
  pub session_lifetime: Duration,
  pub backup_interval: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_file: PathBuf::from("data.json"),
      admins: HashSet::new(),
      secret: None,
      port: 3000,
      renewal_days: 30,
      session_lifetime: Duration::from_secs(3600),
      backup_interval: Duration::from_secs(3600),
    }
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  pub fn from_lookup(
    var: impl Fn(&str) -> Option<String>,
  ) -> anyhow::Result<Self> {
    let mut config = Self::default();

    if let Some(path) = var("DATA_FILE") {
      config.data_file = path.into();
    }
    if let Some(ids) = var("ADMIN_IDS") {
      let ids = utils::parse_ids(&ids).context("Invalid ADMIN_IDS")?;
      config.admins = ids.into_iter().collect();
    }
    config.secret = var("SERVER_SECRET").filter(|secret| !secret.is_empty());
    if let Some(port) = var("PORT") {
      config.port = port.parse().context("Invalid PORT")?;
    }
    if let Some(days) = var("RENEWAL_DAYS") {
      config.renewal_days = days.parse().context("Invalid RENEWAL_DAYS")?;
    }
    if let Some(lifetime) = var("SESSION_LIFETIME") {
      config.session_lifetime = humantime::parse_duration(&lifetime)
        .context("Invalid SESSION_LIFETIME")?;
    }
    if let Some(interval) = var("BACKUP_INTERVAL") {
      config.backup_interval = humantime::parse_duration(&interval)
        .context("Invalid BACKUP_INTERVAL")?;
    }
    anyhow::ensure!(
      !config.backup_interval.is_zero(),
      "BACKUP_INTERVAL must be positive"
    );

    Ok(config)
  }
}

pub struct Services<'a> {
  pub user: sv::User<'a>,
  pub link: sv::Link<'a>,
}

pub struct AppState {
  pub store: Store,
  pub bot: Bot,
  pub sessions: Sessions,
  pub config: Config,
  // Backup deduplication
  backup_hash: AtomicU64,
}

fn hash_of(bytes: &[u8]) -> u64 {
  let mut hasher = DefaultHasher::new();
  bytes.hash(&mut hasher);
  hasher.finish()
}

impl AppState {
  pub fn new(bot: Bot, config: Config) -> Self {
    Self {
      store: Store::open(&config.data_file),
      bot,
      sessions: Sessions::new(config.session_lifetime),
      config,
      backup_hash: AtomicU64::new(0),
    }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      user: sv::User::new(&self.store),
      link: sv::Link::new(&self.store),
    }
  }

  pub fn is_admin(&self, user_id: i64) -> bool {
    self.config.admins.contains(&user_id)
  }

  async fn send_html(&self, chat_id: ChatId, text: String) {
    if let Err(err) =
      self.bot.send_message(chat_id, text).parse_mode(ParseMode::Html).await
    {
      warn!("Failed to notify chat {chat_id}: {err}");
    }
  }

  pub async fn notify_admins(&self, text: String) {
    let sends = self
      .config
      .admins
      .iter()
      .map(|&admin| self.send_html(ChatId(admin), text.clone()));
    future::join_all(sends).await;
  }

  /// Tells every affected member about their new status.
  pub async fn notify_status(&self, users: &[user::Model]) {
    let link = match self.sv().link.get().await {
      Ok(link) => link,
      Err(err) => {
        warn!("Failed to read link for notifications: {err}");
        None
      }
    };

    // records without a chat cannot be told
    let sends = users.iter().filter_map(|user| {
      let chat_id = user.chat_id?;
      Some(self.send_html(
        ChatId(chat_id),
        text::status_changed(user, link.as_deref()),
      ))
    });
    future::join_all(sends).await;
  }

  /// Sends the data file to admins, but only when it changed since the
  /// previous run. The first run only records the hash.
  pub async fn perform_smart_backup(&self) -> anyhow::Result<()> {
    let content = match fs::read(self.store.path()).await {
      Ok(content) => content,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
        debug!("No data file yet, skipping backup");
        return Ok(());
      }
      Err(err) => return Err(err).context("Failed to read data file"),
    };

    let new_hash = hash_of(&content);
    let old_hash = self.backup_hash.swap(new_hash, Ordering::Relaxed);

    if new_hash == old_hash || old_hash == 0 {
      debug!("No changes in data file, skipping backup notification");
      return Ok(());
    }

    let timestamp = Utc::now().format("%Y-%m-%d_%H-%M-%S");
    let caption = format!(
      "📦 <b>Data Backup</b>\nChanges detected.\nTime: {}",
      timestamp
    );

    for &admin in self.config.admins.iter() {
      let doc = InputFile::memory(content.clone())
        .file_name(format!("backup_{}.json", timestamp));

      let _ = self
        .bot
        .send_document(ChatId(admin), doc)
        .caption(caption.clone())
        .parse_mode(ParseMode::Html)
        .await;
    }

    Ok(())
  }

  pub async fn perform_backup(&self, chat_id: ChatId) -> anyhow::Result<()> {
    let content =
      fs::read(self.store.path()).await.context("Failed to read data file")?;

    let timestamp = Utc::now().format("%Y-%m-%d_%H-%M-%S");
    let doc = InputFile::memory(content)
      .file_name(format!("manual_backup_{}.json", timestamp));
    self.bot.send_document(chat_id, doc).await?;

    Ok(())
  }
}
