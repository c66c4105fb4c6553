use std::sync::Arc;

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::ReplyBot;
use crate::{prelude::*, session::Session, state::AppState};

/// Callback data enum - provides type-safe callback handling
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
  CreateAccount,
}

impl Callback {
  /// Serialize callback to string for Telegram API
  pub fn to_data(&self) -> String {
    match self {
      Callback::CreateAccount => "create_account".to_string(),
    }
  }

  /// Parse callback from string received from Telegram API
  pub fn from_data(data: &str) -> Option<Self> {
    match data {
      "create_account" => Some(Callback::CreateAccount),
      _ => None,
    }
  }
}

pub fn create_account() -> InlineKeyboardMarkup {
  InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
    "Create Account",
    Callback::CreateAccount.to_data(),
  )]])
}

pub async fn handle(
  app: Arc<AppState>,
  bot: ReplyBot,
  data: &str,
) -> Result<()> {
  let Some(callback) = Callback::from_data(data) else {
    debug!("Ignoring unknown callback `{data}`");
    return Ok(());
  };

  match callback {
    Callback::CreateAccount => {
      app.sessions.with(bot.chat_id.0, Session::begin);
      bot.reply_html(text::ASK_NAME).await?;
    }
  }

  Ok(())
}
