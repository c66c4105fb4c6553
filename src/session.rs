//! Per-chat conversation state
//!
//! Sessions live only in memory and are keyed by chat id. A session walks
//! `Idle -> AwaitingName -> AwaitingWhatsapp -> Idle`; the whatsapp number
//! typed in the last step is remembered so a later `/start` can find the
//! record again.

use std::mem;

use crate::prelude::*;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Step {
  #[default]
  Idle,
  AwaitingName,
  AwaitingWhatsapp {
    name: String,
  },
}

/// What a free-text message means in the current step.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
  Ignored,
  Name,
  Submit { name: String, whatsapp: String },
}

#[derive(Debug, Clone)]
pub struct Session {
  pub step: Step,
  pub whatsapp: Option<String>,
  pub last_seen: DateTime,
}

impl Session {
  fn new() -> Self {
    Self { step: Step::Idle, whatsapp: None, last_seen: Utc::now().naive_utc() }
  }

  /// "Create account" pressed: restart from the name prompt.
  pub fn begin(&mut self) {
    self.step = Step::AwaitingName;
  }

  /// Back to the number prompt after a failed submit.
  pub fn resume(&mut self, name: String) {
    self.step = Step::AwaitingWhatsapp { name };
  }

  pub fn feed(&mut self, text: &str) -> Input {
    match mem::take(&mut self.step) {
      Step::Idle => Input::Ignored,
      Step::AwaitingName => {
        self.step = Step::AwaitingWhatsapp { name: text.to_string() };
        Input::Name
      }
      Step::AwaitingWhatsapp { name } => {
        self.whatsapp = Some(text.to_string());
        Input::Submit { name, whatsapp: text.to_string() }
      }
    }
  }
}

pub struct Sessions {
  inner: DashMap<i64, Session>,
  lifetime: TimeDelta,
}

impl Sessions {
  pub fn new(lifetime: Duration) -> Self {
    Self {
      inner: DashMap::new(),
      lifetime: TimeDelta::from_std(lifetime).unwrap_or(TimeDelta::MAX),
    }
  }

  /// Runs `f` on the chat's session, creating it if needed.
  pub fn with<T>(&self, chat_id: i64, f: impl FnOnce(&mut Session) -> T) -> T {
    let mut session = self.inner.entry(chat_id).or_insert_with(Session::new);
    session.last_seen = Utc::now().naive_utc();
    f(session.value_mut())
  }

  pub fn remembered(&self, chat_id: i64) -> Option<String> {
    self.inner.get(&chat_id).and_then(|session| session.whatsapp.clone())
  }

  #[cfg(test)]
  pub fn step(&self, chat_id: i64) -> Step {
    self
      .inner
      .get(&chat_id)
      .map(|session| session.step.clone())
      .unwrap_or_default()
  }

  pub fn clear(&self, chat_id: i64) {
    self.inner.remove(&chat_id);
  }

  pub fn len(&self) -> usize {
    self.inner.len()
  }

  /// Drops sessions idle for longer than the configured lifetime.
  pub fn gc(&self) -> usize {
    let now = Utc::now().naive_utc();
    let before = self.inner.len();

    self.inner.retain(|_, session| now - session.last_seen < self.lifetime);

    before.saturating_sub(self.inner.len())
  }
}
