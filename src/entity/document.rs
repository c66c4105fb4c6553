use serde::{Deserialize, Serialize};

use super::user;

/// The whole data file: every user record plus the shared link.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
  #[serde(default)]
  pub users: Vec<user::Model>,
  #[serde(default)]
  pub link: String,
  /// Top-level keys written by other tools
  #[serde(flatten)]
  pub extra: json::Map<String, json::Value>,
}

impl Document {
  pub fn by_whatsapp<'a>(
    &'a self,
    whatsapp: &'a str,
  ) -> impl Iterator<Item = &'a user::Model> {
    self.users.iter().filter(move |user| user.whatsapp == whatsapp)
  }

  pub fn by_whatsapp_mut<'a>(
    &'a mut self,
    whatsapp: &'a str,
  ) -> impl Iterator<Item = &'a mut user::Model> {
    self.users.iter_mut().filter(move |user| user.whatsapp == whatsapp)
  }
}
