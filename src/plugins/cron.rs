//! Periodic housekeeping: idle session cleanup and data file backups.

use std::sync::Arc;

use crate::{prelude::*, state::AppState};

const SESSION_GC_PERIOD: Duration = Duration::from_secs(60);

pub struct Plugin;

#[async_trait::async_trait]
impl super::Plugin for Plugin {
  fn name(&self) -> &'static str {
    "cron"
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let mut gc = time::interval(SESSION_GC_PERIOD);
    let mut backup = time::interval(app.config.backup_interval);

    let backups = !app.config.admins.is_empty();
    if !backups {
      warn!("No admins configured, auto-backups disabled");
    }

    loop {
      tokio::select! {
        _ = gc.tick() => {
          let dropped = app.sessions.gc();
          if dropped > 0 {
            debug!("Dropped {dropped} idle sessions");
          }
        }
        _ = backup.tick(), if backups => {
          if let Err(err) = app.perform_smart_backup().await {
            error!("Auto-backup failed: {err:#}");
          }
        }
      }
    }
  }
}
