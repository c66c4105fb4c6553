//! User record - one registered member profile

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Verification state of a record.
///
/// Values other than the three known ones are kept verbatim so hand-edited
/// records survive a save; they never count as verified or rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
  Pending,
  Verified,
  Rejected,
  Other(String),
}

impl From<String> for Status {
  fn from(value: String) -> Self {
    match value.as_str() {
      "pending" => Status::Pending,
      "verified" => Status::Verified,
      "rejected" => Status::Rejected,
      _ => Status::Other(value),
    }
  }
}

impl From<Status> for String {
  fn from(status: Status) -> Self {
    match status {
      Status::Other(value) => value,
      known => known.as_str().to_string(),
    }
  }
}

impl Status {
  pub fn as_str(&self) -> &str {
    match self {
      Status::Pending => "pending",
      Status::Verified => "verified",
      Status::Rejected => "rejected",
      Status::Other(value) => value,
    }
  }

  pub fn icon(&self) -> &'static str {
    match self {
      Status::Pending => "⏳",
      Status::Verified => "✅",
      Status::Rejected => "⛔",
      Status::Other(_) => "❔",
    }
  }

  /// Only verified and rejected records short-circuit a lookup.
  pub fn is_settled(&self) -> bool {
    matches!(self, Status::Verified | Status::Rejected)
  }

  pub fn is_known(&self) -> bool {
    !matches!(self, Status::Other(_))
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
  pub name: String,
  /// Contact number, compared verbatim
  pub whatsapp: String,
  /// Telegram chat the record was last seen from
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub chat_id: Option<i64>,
  pub status: Status,
  #[serde(default)]
  pub remaining_days: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_verified: Option<Date>,
  /// Fields written by other tools
  #[serde(flatten)]
  pub extra: json::Map<String, json::Value>,
}

impl Model {
  pub fn pending(
    name: String,
    whatsapp: String,
    chat_id: i64,
    today: Date,
  ) -> Self {
    Self {
      name,
      whatsapp,
      chat_id: Some(chat_id),
      status: Status::Pending,
      remaining_days: 0,
      last_verified: Some(today),
      extra: json::Map::new(),
    }
  }
}
