use std::sync::Arc;

use teloxide::utils::command::BotCommands;

use super::ReplyBot;
use crate::{
  entity::{Status, user},
  prelude::*,
  session::Sessions,
  state::{AppState, Services},
  sv,
};

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
  // deep-link payload, ignored
  Start(String),
  Renew,
  Help,
  // Admin commands below
  Users,
  Pending,
  Info(String),
  Verify(String),
  Reject(String),
  Link,
  SetLink(String),
  Stats,
  Backup,
}

pub async fn handle(
  app: Arc<AppState>,
  bot: ReplyBot,
  cmd: Command,
) -> Result<()> {
  let sv = app.sv();
  let chat_id = bot.chat_id.0;

  match &cmd {
    Command::Start(_) => {
      if let Some(user) =
        returning_member(&app.sessions, &sv.user, chat_id).await?
      {
        debug!("Chat {chat_id} re-attached to {}", user.whatsapp);
        bot.reply_html(text::status(&user)).await?;
        return Ok(());
      }

      bot
        .reply_with_keyboard(
          text::welcome(&bot.first_name),
          super::callback::create_account(),
        )
        .await?;
      return Ok(());
    }
    Command::Renew => {
      match sv.user.renew(chat_id, app.config.renewal_days).await? {
        Some(user) => {
          info!(
            "Renewed {} by {} days, total {}",
            user.whatsapp, app.config.renewal_days, user.remaining_days
          );
          bot.reply_html(text::renewed(&user)).await?;
        }
        None => {
          bot.reply_html(text::RENEW_DENIED).await?;
        }
      }
      return Ok(());
    }
    Command::Help if app.is_admin(bot.user_id) => {
      bot.reply_html(text::ADMIN_HELP).await?;
      return Ok(());
    }
    Command::Help => {
      bot.reply_html(text::HELP).await?;
      return Ok(());
    }
    _ => {}
  }

  if app.is_admin(bot.user_id) {
    handle_admin_command(&app, &sv, &bot, cmd).await?;
  }

  Ok(())
}

/// Settled record behind the number this chat typed earlier, if any.
pub async fn returning_member(
  sessions: &Sessions,
  users: &sv::User<'_>,
  chat_id: i64,
) -> Result<Option<user::Model>> {
  match sessions.remembered(chat_id) {
    Some(whatsapp) => users.claim(chat_id, whatsapp).await,
    None => Ok(None),
  }
}

fn whatsapp_arg(input: &str, usage: &str) -> Result<String> {
  let input = input.trim();
  if input.is_empty() {
    return Err(Error::InvalidArgs(format!("Usage: {usage} <whatsapp>")));
  }
  Ok(input.to_string())
}

async fn set_status(
  app: &AppState,
  sv: &Services<'_>,
  input: &str,
  status: Status,
) -> Result<String> {
  let usage = match status {
    Status::Verified => "/verify",
    _ => "/reject",
  };
  let whatsapp = whatsapp_arg(input, usage)?;

  let users = sv.user.set_status(whatsapp.clone(), status.clone()).await?;
  info!("Admin set {} record(s) of {whatsapp} to {:?}", users.len(), status);
  app.notify_status(&users).await;

  Ok(format!(
    "{} {} record(s) of <code>{}</code> marked as {}, owners notified",
    status.icon(),
    users.len(),
    teloxide::utils::html::escape(&whatsapp),
    status.as_str()
  ))
}

async fn info(sv: &Services<'_>, input: &str) -> Result<String> {
  let whatsapp = whatsapp_arg(input, "/info")?;
  let users = sv.user.by_whatsapp(whatsapp).await?;
  if users.is_empty() {
    return Err(Error::UserNotFound);
  }
  Ok(users.iter().map(text::user_info).collect::<Vec<_>>().join("\n\n"))
}

async fn handle_admin_command(
  app: &AppState,
  sv: &Services<'_>,
  bot: &ReplyBot,
  cmd: Command,
) -> Result<()> {
  let result: Result<String> = match cmd {
    Command::Users => {
      let users = sv.user.all().await?;
      bot.reply_html_chunked(text::user_list("👥 Users", &users)).await?;
      return Ok(());
    }
    Command::Pending => {
      let users = sv.user.by_status(Status::Pending).await?;
      bot.reply_html_chunked(text::user_list("⏳ Pending", &users)).await?;
      return Ok(());
    }
    Command::Info(input) => info(sv, &input).await,
    Command::Verify(input) => {
      set_status(app, sv, &input, Status::Verified).await
    }
    Command::Reject(input) => {
      set_status(app, sv, &input, Status::Rejected).await
    }
    Command::Link => sv.link.get().await.map(|link| match link {
      Some(link) => format!("🔗 {}", teloxide::utils::html::escape(&link)),
      None => "🔗 No link set".into(),
    }),
    Command::SetLink(link) => {
      let cleared = link.trim().is_empty();
      let reply = if cleared { "✅ Link cleared" } else { "✅ Link updated" };
      sv.link.set(link).await.map(|_| reply.into())
    }
    Command::Stats => sv.user.count_by_status().await.map(|counts| {
      let count = |status: Status| counts.get(&status).copied().unwrap_or(0);
      format!(
        "📊 <b>Stats</b>\n\n\
        Users: {}\n\
        ✅ Verified: {}\n\
        ⏳ Pending: {}\n\
        ⛔ Rejected: {}\n\
        Active Sessions: {}",
        counts.values().sum::<usize>(),
        count(Status::Verified),
        count(Status::Pending),
        count(Status::Rejected),
        app.sessions.len()
      )
    }),
    Command::Backup => match app.perform_backup(bot.chat_id).await {
      Ok(()) => return Ok(()),
      Err(err) => {
        warn!("Manual backup failed: {err:#}");
        let message = teloxide::utils::html::escape(&format!("{err:#}"));
        bot.reply_html(format!("❌ Backup failed: {message}")).await?;
        return Ok(());
      }
    },
    _ => return Ok(()),
  };

  match result {
    Ok(reply) => {
      bot.reply_html(reply).await?;
    }
    Err(
      err @ (Error::InvalidArgs(_)
      | Error::UserNotFound
      | Error::Malformed(_)),
    ) => {
      let message = teloxide::utils::html::escape(&err.to_string());
      bot.reply_html(format!("❌ {message}")).await?;
    }
    Err(err) => return Err(err),
  }

  Ok(())
}
