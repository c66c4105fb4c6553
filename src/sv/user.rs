use crate::{
  entity::{Status, user},
  prelude::*,
  store::{Store, Tx},
};

/// Outcome of the final registration step.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
  Created(user::Model),
  /// A verified or rejected record already owns this number.
  Exists(user::Model),
}

pub struct User<'a> {
  store: &'a Store,
}

impl<'a> User<'a> {
  pub fn new(store: &'a Store) -> Self {
    Self { store }
  }

  /// Re-attaches records with this number to the chat.
  ///
  /// Matching records get the chat id in file order up to and including
  /// the first settled one, which is returned. Pending-only matches yield
  /// `None` but still get the new chat id.
  pub async fn claim(
    &self,
    chat_id: i64,
    whatsapp: String,
  ) -> Result<Option<user::Model>> {
    self
      .store
      .transact(move |doc| {
        let mut dirty = false;
        let mut found = None;

        for user in doc.by_whatsapp_mut(&whatsapp) {
          user.chat_id = Some(chat_id);
          dirty = true;
          if user.status.is_settled() {
            found = Some(user.clone());
            break;
          }
        }

        if dirty { Tx::save(found) } else { Tx::keep(found) }
      })
      .await
  }

  pub async fn register(
    &self,
    chat_id: i64,
    name: String,
    whatsapp: String,
    today: Date,
  ) -> Result<Registration> {
    self
      .store
      .transact(move |doc| {
        if let Some(user) =
          doc.by_whatsapp(&whatsapp).find(|user| user.status.is_settled())
        {
          return Tx::keep(Registration::Exists(user.clone()));
        }

        let user = user::Model::pending(name, whatsapp, chat_id, today);
        doc.users.push(user.clone());
        Tx::save(Registration::Created(user))
      })
      .await
  }

  /// Adds `days` to the first verified record of this chat.
  pub async fn renew(
    &self,
    chat_id: i64,
    days: u32,
  ) -> Result<Option<user::Model>> {
    self
      .store
      .transact(move |doc| {
        let user = doc.users.iter_mut().find(|user| {
          user.chat_id == Some(chat_id) && user.status == Status::Verified
        });

        match user {
          Some(user) => {
            user.remaining_days = user.remaining_days.saturating_add(days);
            Tx::save(Some(user.clone()))
          }
          None => Tx::keep(None),
        }
      })
      .await
  }

  /// Out-of-band verification: updates every record with this number.
  pub async fn set_status(
    &self,
    whatsapp: String,
    status: Status,
  ) -> Result<Vec<user::Model>> {
    let updated = self
      .store
      .transact(move |doc| {
        let updated: Vec<_> = doc
          .by_whatsapp_mut(&whatsapp)
          .map(|user| {
            user.status = status.clone();
            user.clone()
          })
          .collect();

        if updated.is_empty() { Tx::keep(updated) } else { Tx::save(updated) }
      })
      .await?;

    if updated.is_empty() {
      return Err(Error::UserNotFound);
    }
    Ok(updated)
  }

  pub async fn by_whatsapp(
    &self,
    whatsapp: String,
  ) -> Result<Vec<user::Model>> {
    self
      .store
      .read(move |doc| doc.by_whatsapp(&whatsapp).cloned().collect())
      .await
  }

  pub async fn all(&self) -> Result<Vec<user::Model>> {
    self.store.read(|doc| doc.users.clone()).await
  }

  pub async fn by_status(&self, status: Status) -> Result<Vec<user::Model>> {
    self
      .store
      .read(move |doc| {
        doc
          .users
          .iter()
          .filter(|user| user.status == status)
          .cloned()
          .collect()
      })
      .await
  }

  pub async fn count_by_status(&self) -> Result<HashMap<Status, usize>> {
    self
      .store
      .read(|doc| {
        let mut counts = HashMap::new();
        for user in &doc.users {
          *counts.entry(user.status.clone()).or_insert(0) += 1;
        }
        counts
      })
      .await
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;
  use crate::{entity::Document, store};

  fn today() -> Date {
    Date::from_ymd_opt(2024, 3, 1).unwrap()
  }

  fn record(whatsapp: &str, chat_id: i64, status: Status) -> user::Model {
    user::Model {
      name: format!("user {whatsapp}"),
      whatsapp: whatsapp.into(),
      chat_id: Some(chat_id),
      status,
      remaining_days: 0,
      last_verified: Some(today()),
      extra: json::Map::new(),
    }
  }

  async fn setup(users: Vec<user::Model>) -> (TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.json");
    if !users.is_empty() {
      store::save(&path, &Document { users, ..Default::default() })
        .await
        .unwrap();
    }
    (dir, Store::open(path))
  }

  #[tokio::test]
  async fn test_register_appends_pending_record() {
    let (_dir, store) = setup(vec![]).await;
    let sv = User::new(&store);

    let result =
      sv.register(10, "Alice".into(), "+1".into(), today()).await.unwrap();

    let Registration::Created(user) = result else {
      panic!("expected a new record");
    };
    assert_eq!(user.status, Status::Pending);
    assert_eq!(user.remaining_days, 0);
    assert_eq!(user.chat_id, Some(10));
    assert_eq!(user.last_verified, Some(today()));

    let all = sv.all().await.unwrap();
    assert_eq!(all, vec![user]);
  }

  #[tokio::test]
  async fn test_register_twice_while_pending_duplicates() {
    let (_dir, store) = setup(vec![]).await;
    let sv = User::new(&store);

    sv.register(10, "Alice".into(), "+1".into(), today()).await.unwrap();
    let second =
      sv.register(11, "Alice".into(), "+1".into(), today()).await.unwrap();

    assert!(matches!(second, Registration::Created(_)));
    assert_eq!(sv.by_whatsapp("+1".into()).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_register_blocked_by_settled_record() {
    let (_dir, store) = setup(vec![
      record("+1", 5, Status::Pending),
      record("+1", 6, Status::Rejected),
    ])
    .await;
    let sv = User::new(&store);

    let result =
      sv.register(10, "Mallory".into(), "+1".into(), today()).await.unwrap();

    assert_eq!(result, Registration::Exists(record("+1", 6, Status::Rejected)));
    assert_eq!(sv.all().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_renew_verified_record() {
    let mut user = record("+1", 10, Status::Verified);
    user.remaining_days = 5;
    let (_dir, store) = setup(vec![user]).await;
    let sv = User::new(&store);

    let renewed = sv.renew(10, 30).await.unwrap().unwrap();

    assert_eq!(renewed.remaining_days, 35);
    assert_eq!(sv.all().await.unwrap()[0].remaining_days, 35);
  }

  #[tokio::test]
  async fn test_renew_without_match_does_not_touch_file() {
    let (dir, store) = setup(vec![
      record("+1", 10, Status::Pending),
      record("+2", 11, Status::Verified),
    ])
    .await;
    let path = dir.path().join("data.json");
    let before = tokio::fs::read(&path).await.unwrap();

    let sv = User::new(&store);
    assert_eq!(sv.renew(10, 30).await.unwrap(), None);
    assert_eq!(sv.renew(99, 30).await.unwrap(), None);

    assert_eq!(tokio::fs::read(&path).await.unwrap(), before);
  }

  #[tokio::test]
  async fn test_claim_stops_at_first_settled_record() {
    let (_dir, store) = setup(vec![
      record("+1", 1, Status::Pending),
      record("+1", 2, Status::Verified),
      record("+1", 3, Status::Rejected),
    ])
    .await;
    let sv = User::new(&store);

    let found = sv.claim(42, "+1".into()).await.unwrap().unwrap();
    assert_eq!(found.status, Status::Verified);

    let chats: Vec<_> =
      sv.all().await.unwrap().iter().map(|user| user.chat_id).collect();
    assert_eq!(chats, vec![Some(42), Some(42), Some(3)]);
  }

  #[tokio::test]
  async fn test_claim_pending_only() {
    let (_dir, store) = setup(vec![record("+1", 1, Status::Pending)]).await;
    let sv = User::new(&store);

    assert_eq!(sv.claim(42, "+1".into()).await.unwrap(), None);
    assert_eq!(sv.all().await.unwrap()[0].chat_id, Some(42));
  }

  #[tokio::test]
  async fn test_set_status() {
    let (_dir, store) = setup(vec![
      record("+1", 1, Status::Pending),
      record("+2", 2, Status::Pending),
      record("+1", 3, Status::Pending),
    ])
    .await;
    let sv = User::new(&store);

    let updated = sv.set_status("+1".into(), Status::Verified).await.unwrap();
    assert_eq!(updated.len(), 2);

    let counts = sv.count_by_status().await.unwrap();
    assert_eq!(counts.get(&Status::Verified), Some(&2));
    assert_eq!(counts.get(&Status::Pending), Some(&1));
    assert_eq!(sv.by_status(Status::Pending).await.unwrap()[0].whatsapp, "+2");

    let missing = sv.set_status("+404".into(), Status::Rejected).await;
    assert!(matches!(missing, Err(Error::UserNotFound)));
  }

  #[tokio::test]
  async fn test_unknown_status_never_blocks_or_renews() {
    let (_dir, store) =
      setup(vec![record("+1", 10, Status::Other("Verified".into()))]).await;
    let sv = User::new(&store);

    assert_eq!(sv.renew(10, 30).await.unwrap(), None);
    assert_eq!(sv.claim(10, "+1".into()).await.unwrap(), None);

    let result =
      sv.register(10, "Alice".into(), "+1".into(), today()).await.unwrap();
    assert!(matches!(result, Registration::Created(_)));
  }

  #[tokio::test]
  async fn test_claim_fills_missing_chat_id() {
    let mut user = record("+1", 0, Status::Verified);
    user.chat_id = None;
    let (_dir, store) = setup(vec![user]).await;
    let sv = User::new(&store);

    let found = sv.claim(42, "+1".into()).await.unwrap().unwrap();
    assert_eq!(found.chat_id, Some(42));
    assert_eq!(sv.renew(42, 30).await.unwrap().unwrap().remaining_days, 30);
  }
}
