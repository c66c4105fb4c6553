//! Free-text input driving the registration steps.

use std::sync::Arc;

use super::ReplyBot;
use crate::{
  entity::user,
  prelude::*,
  session::{Input, Sessions},
  state::AppState,
  sv::{self, Registration},
};

/// What a free-text message leads to.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  Ignored,
  AskWhatsapp,
  Registered(user::Model),
  /// A settled record owns the number; the session keeps it remembered.
  Exists(user::Model),
}

pub async fn advance(
  sessions: &Sessions,
  users: &sv::User<'_>,
  chat_id: i64,
  input: &str,
  today: Date,
) -> Result<Outcome> {
  let (name, whatsapp) = match sessions.with(chat_id, |s| s.feed(input)) {
    Input::Ignored => return Ok(Outcome::Ignored),
    Input::Name => return Ok(Outcome::AskWhatsapp),
    Input::Submit { name, whatsapp } => (name, whatsapp),
  };

  match users.register(chat_id, name.clone(), whatsapp, today).await {
    Ok(Registration::Created(user)) => {
      sessions.clear(chat_id);
      Ok(Outcome::Registered(user))
    }
    Ok(Registration::Exists(user)) => Ok(Outcome::Exists(user)),
    Err(err) => {
      // let the user resend the number
      sessions.with(chat_id, |s| s.resume(name));
      Err(err)
    }
  }
}

pub async fn handle(
  app: Arc<AppState>,
  bot: ReplyBot,
  input: String,
) -> Result<()> {
  let chat_id = bot.chat_id.0;
  let sv = app.sv();

  let today = utils::today();
  let outcome =
    advance(&app.sessions, &sv.user, chat_id, &input, today).await?;

  match outcome {
    Outcome::Ignored => {
      debug!("Chat {chat_id} sent text outside of registration");
    }
    Outcome::AskWhatsapp => {
      bot.reply_html(text::ASK_WHATSAPP).await?;
    }
    Outcome::Registered(user) => {
      info!("New registration {} from chat {chat_id}", user.whatsapp);
      bot.reply_html(text::REGISTERED).await?;
      app.notify_admins(text::new_registration(&user)).await;
    }
    Outcome::Exists(user) => {
      debug!("Chat {chat_id} hit {:?} {}", user.status, user.whatsapp);
      bot.reply_html(text::status(&user)).await?;
    }
  }

  Ok(())
}
