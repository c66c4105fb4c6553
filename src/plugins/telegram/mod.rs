mod callback;
mod command;
mod message;

use std::sync::Arc;

use command::Command;
use teloxide::{
  Bot,
  dispatching::{Dispatcher, HandlerExt, UpdateFilterExt},
  error_handlers::LoggingErrorHandler,
  prelude::*,
  types::{
    CallbackQuery, ChatId, InlineKeyboardMarkup, Message, ParseMode, Update,
  },
};

use crate::{prelude::*, state::AppState};

pub struct Plugin;

#[async_trait::async_trait]
impl super::Plugin for Plugin {
  fn name(&self) -> &'static str {
    "telegram"
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    run_bot(app).await;
    Ok(())
  }
}

pub async fn run_bot(app: Arc<AppState>) {
  info!("Starting Telegram bot...");

  let bot = app.bot.clone();

  let handler = teloxide::dptree::entry()
    .branch(Update::filter_message().filter_command::<Command>().endpoint({
      let app = app.clone();
      move |bot: Bot, msg: Message, cmd: Command| {
        let app = app.clone();
        let bot = ReplyBot::from_message(bot, &msg);
        command::handle(app, bot, cmd)
      }
    }))
    .branch(Update::filter_message().endpoint({
      let app = app.clone();
      move |bot: Bot, msg: Message| {
        let app = app.clone();
        message_handle(app, bot, msg)
      }
    }))
    .branch(Update::filter_callback_query().endpoint({
      let app = app.clone();
      move |bot: Bot, query: CallbackQuery| {
        let app = app.clone();
        callback_handle(app, bot, query)
      }
    }));

  Dispatcher::builder(bot, handler)
    .error_handler(LoggingErrorHandler::with_custom_text(
      "Failed to handle update",
    ))
    .build()
    .dispatch()
    .await;
}

async fn message_handle(
  app: Arc<AppState>,
  bot: Bot,
  msg: Message,
) -> Result<()> {
  // unknown commands are not free text
  let Some(text) = msg.text().filter(|text| !text.starts_with('/')) else {
    return Ok(());
  };

  let input = text.to_string();
  message::handle(app, ReplyBot::from_message(bot, &msg), input).await
}

async fn callback_handle(
  app: Arc<AppState>,
  bot: Bot,
  query: CallbackQuery,
) -> Result<()> {
  if let Some(data) = query.data.as_deref()
    && let Some(msg) = query.message.as_ref()
  {
    let bot = ReplyBot {
      inner: bot,
      user_id: query.from.id.0 as i64,
      chat_id: msg.chat().id,
      first_name: query.from.first_name.clone(),
    };

    // answer callback to remove loading state
    bot.inner.answer_callback_query(query.id.clone()).await?;

    callback::handle(app, bot, data).await
  } else {
    Ok(())
  }
}

#[derive(Debug, Clone)]
struct ReplyBot {
  inner: Bot,
  pub user_id: i64,
  pub chat_id: ChatId,
  pub first_name: String,
}

impl ReplyBot {
  fn from_message(inner: Bot, msg: &Message) -> Self {
    let (user_id, first_name) = match msg.from.as_ref() {
      Some(user) => (user.id.0 as i64, user.first_name.clone()),
      None => (msg.chat.id.0, String::new()),
    };

    Self { inner, user_id, chat_id: msg.chat.id, first_name }
  }

  async fn reply_html(&self, text: impl Into<String>) -> Result<Message> {
    let msg = self
      .inner
      .send_message(self.chat_id, text.into())
      .parse_mode(ParseMode::Html)
      .await?;
    Ok(msg)
  }

  /// Send a potentially long message by splitting it into chunks if needed.
  async fn reply_html_chunked(&self, text: impl Into<String>) -> Result<()> {
    for chunk in utils::chunk_message(&text.into(), 0) {
      self.reply_html(chunk).await?;
    }
    Ok(())
  }

  async fn reply_with_keyboard(
    &self,
    text: impl Into<String>,
    keyboard: InlineKeyboardMarkup,
  ) -> Result<Message> {
    let msg = self
      .inner
      .send_message(self.chat_id, text.into())
      .parse_mode(ParseMode::Html)
      .reply_markup(keyboard)
      .await?;
    Ok(msg)
  }
}
